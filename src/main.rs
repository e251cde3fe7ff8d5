#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use lazy_static::lazy_static;
use log::info;
use poem::listener::TcpListener;

// Meme Utilities
use crate::api::{build_app, MemeCtx};
use crate::utils::catalog::CategoryTable;
use crate::utils::config::{init_log, init_runtime_context, RuntimeCtx, MEME_ARGS, MEME_DIRS};
use crate::utils::errors::Errors;

// Modules
mod api;
mod utils;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME : &str = "MemeServer"; // for poem logging

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Lazily initialize the parameters variable so that is has a 'static lifetime.
// We exit if we can't read our parameters.
lazy_static! {
    static ref RUNTIME_CTX: RuntimeCtx = init_runtime_context();
}

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<()> {
    // --------------- Initialize Server --------------
    println!("Starting meme_server!");

    // Create the data directories and stop if that's all that was asked for.
    if MEME_ARGS.create_dirs_only {
        println!("Data directories are rooted at {}.", MEME_DIRS.root_dir);
        return Ok(());
    }

    // Initialize the server.
    let ctx = meme_init()?;
    let config = &RUNTIME_CTX.parms.config;

    // --------------- Main Loop Set Up ---------------
    let addr = format!("{}:{}", config.http_addr, config.http_port);
    let server_url = format!("http://{}", addr);
    let app = build_app(ctx, config, &server_url);
    info!("Listening on {}; meme requests are spaced {:?} apart per handler.",
          addr, config.throttle().spacing());

    // ------------------ Main Loop -------------------
    poem::Server::new(TcpListener::bind(addr))
        .name(SERVER_NAME)
        .run(app)
        .await?;
    Ok(())
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// meme_init:
// ---------------------------------------------------------------------------
/** Initialize all subsystems and build the immutable request context. */
fn meme_init() -> Result<Arc<MemeCtx>> {
    // Force the reading of input parameters and initialization of runtime context.
    let config = &RUNTIME_CTX.parms.config;

    // Configure our log.
    init_log(config.debug)?;
    info!("{}", Errors::InputParms(format!("{:#?}", *RUNTIME_CTX)));

    // Log build info.
    print_version_info();

    // The catalog is built once and shared read-only by all handlers.
    let table = CategoryTable::builtin()?;
    info!("Loaded {} meme categories: {}.", table.names().len(), table.names().join(", "));

    Ok(Arc::new(MemeCtx::new(table, config.latency_range()?)))
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    info!("\n*** Running MEME_SERVER={}, BRANCH={}, COMMIT={}, DIRTY={}, SRC_TS={}, RUSTC={}.",
          option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
          option_env!("GIT_BRANCH").unwrap_or("unknown"),
          option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
          option_env!("GIT_DIRTY").unwrap_or("unknown"),
          option_env!("SOURCE_TIMESTAMP").unwrap_or("unknown"),
          option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}
