#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use log::{info, LevelFilter};
use serde::Deserialize;
use std::{env, fs, path::Path};
use fs_mistrust::Mistrust;
use std::os::unix::fs::PermissionsExt;
use lazy_static::lazy_static;
use structopt::StructOpt;

use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

// Meme Utilities
use crate::utils::errors::Errors;
use crate::utils::shaping::LatencyRange;
use crate::utils::throttle::Throttle;

use super::meme_utils::get_absolute_path;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and directories
// are relative to the root directory.
const ENV_MEME_ROOT_DIR    : &str = "MEME_ROOT_DIR";
const DEFAULT_ROOT_DIR     : &str = "~/.meme_server";
const CONFIG_DIR           : &str = "/config";
const LOGS_DIR             : &str = "/logs";
const LOG4RS_CONFIG_FILE   : &str = "/log4rs.yml";       // relative to config dir
const MEME_CONFIG_FILE     : &str = "/meme_server.toml"; // relative to config dir

// Networking.
const DEFAULT_HTTP_ADDR    : &str = "0.0.0.0";
const DEFAULT_HTTP_PORT    : u16  = 5000;

// Request shaping.
const DEFAULT_MAX_PER_MINUTE : u32 = 120;
const DEFAULT_LATENCY_MIN_MS : u64 = 100;
const DEFAULT_LATENCY_MAX_MS : u64 = 500;

// The local development front ends.
const DEFAULT_ORIGINS : [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

// Console logging when no log4rs file is present.
const CONSOLE_PATTERN : &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l})} {t} - {m}{n}";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref MEME_ARGS: MemeArgs = init_meme_args();
}

// Calculate the data directories BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref MEME_DIRS: MemeDirs = init_meme_dirs();
}

// ***************************************************************************
//                             Directory Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// MemeDirs:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct MemeDirs {
    pub root_dir: String,
    pub config_dir: String,
    pub logs_dir: String,
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// MemeArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, Default, StructOpt)]
#[structopt(name = "meme_args", about = "Command line arguments for the meme server.")]
pub struct MemeArgs {
    /// Specify the server's root data directory.
    ///
    /// The root directory contains the config and logs subdirectories.  It is
    /// calculated using the following priority order:
    ///
    ///   1. If set, the value of the MEME_ROOT_DIR environment,
    ///
    ///   2. Otherwise, if set, the value of the --root-dir command line argument,
    ///
    ///   3. Otherwise, ~/.meme_server
    ///
    #[structopt(short, long)]
    pub root_dir: Option<String>,

    /// Create the data directories and then exit.
    #[structopt(short, long)]
    pub create_dirs_only: bool,

    /// Address to listen on, overrides the configuration file.
    #[structopt(long)]
    pub host: Option<String>,

    /// Port to listen on, overrides the configuration file.
    #[structopt(short, long)]
    pub port: Option<u16>,

    /// Turn on debug logging, overrides the configuration file.
    #[structopt(short, long)]
    pub debug: bool,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct RuntimeCtx {
    pub parms: Parms,
    pub meme_args: &'static MemeArgs,
    pub meme_dirs: &'static MemeDirs,
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub http_addr: String,
    pub http_port: u16,
    pub debug: bool,
    pub max_requests_per_minute: u32,
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /** Check the values that serde can't. */
    pub fn validate(&self) -> Result<(), Errors> {
        self.latency_range()?;
        if self.allowed_origins.is_empty() {
            return Err(Errors::InvalidConfig("allowed_origins must not be empty".to_string()));
        }
        if self.allowed_origins.iter().any(|o| o.trim().is_empty()) {
            return Err(Errors::InvalidConfig("allowed_origins contains a blank origin".to_string()));
        }
        Ok(())
    }

    pub fn latency_range(&self) -> Result<LatencyRange, Errors> {
        LatencyRange::new(self.latency_min_ms, self.latency_max_ms)
    }

    pub fn throttle(&self) -> Throttle {
        Throttle::per_minute(self.max_requests_per_minute)
    }

    /** Command line values take precedence over the file. */
    pub fn apply_args(mut self, args: &MemeArgs) -> Self {
        if let Some(host) = &args.host {
            self.http_addr = host.clone();
        }
        if let Some(port) = args.port {
            self.http_port = port;
        }
        if args.debug {
            self.debug = true;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Meme Server".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            debug: false,
            max_requests_per_minute: DEFAULT_MAX_PER_MINUTE,
            latency_min_ms: DEFAULT_LATENCY_MIN_MS,
            latency_max_ms: DEFAULT_LATENCY_MAX_MS,
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_meme_args:
// ---------------------------------------------------------------------------
/** Get the command line arguments. */
fn init_meme_args() -> MemeArgs {
    let args = MemeArgs::from_args();
    println!("{:?}", args);
    args
}

// ---------------------------------------------------------------------------
// init_meme_dirs:
// ---------------------------------------------------------------------------
/** Calculate the external data directories, creating any that are missing. */
fn init_meme_dirs() -> MemeDirs {
    let mistrust = get_mistrust();

    let root_dir = get_root_dir();
    check_meme_dir(&root_dir, "root directory", &mistrust);

    let config_dir = root_dir.clone() + CONFIG_DIR;
    check_meme_dir(&config_dir, "config directory", &mistrust);

    let logs_dir = root_dir.clone() + LOGS_DIR;
    check_meme_dir(&logs_dir, "logs directory", &mistrust);

    MemeDirs {root_dir, config_dir, logs_dir}
}

// ---------------------------------------------------------------------------
// check_meme_dir:
// ---------------------------------------------------------------------------
/** Check that the path is absolute and, if it exists, that is has the proper
 * permissions assigned.  If it doesn't exist, create it.  The mistrust package
 * creates directories with 0o700 permissions.
 *
 * Any failure results in a panic since the server can't start without them.
 */
fn check_meme_dir(dir: &str, msgname: &str, mistrust: &Mistrust) {
    let path = Path::new(dir);
    if !path.is_absolute() {
        panic!("The meme server {} path must be absolute: {}", msgname, dir);
    }
    if path.exists() {
        if !path.is_dir() {
            panic!("The meme server {} path must be a directory: {}", msgname, dir);
        }

        // Owner only access.
        let meta = path.metadata().unwrap_or_else(|_| panic!("Unable to read metadata for {}: {}", msgname, dir));
        let perm = meta.permissions().mode();
        if perm & 0o777 != 0o700 {
            panic!("The meme server {} path must be have 0o700 permissions: {}", msgname, dir);
        }
    } else if let Err(e) = mistrust.make_directory(path) {
        panic!("Make directory error for {:?}: {}", path, e);
    }
}

// ---------------------------------------------------------------------------
// get_mistrust:
// ---------------------------------------------------------------------------
/** Configure a new mistrust object for initial directory processing. */
fn get_mistrust() -> Mistrust {
    match Mistrust::builder()
        .ignore_prefix(get_absolute_path("~"))
        .trust_group(0)
        .build() {
            Ok(m) => m,
            Err(e) => panic!("Mistrust configuration error: {}", e),
        }
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
fn get_root_dir() -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Default location
    let root_dir = env::var(ENV_MEME_ROOT_DIR).unwrap_or_else(
        |_| {
            match MEME_ARGS.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    get_absolute_path(&root_dir)
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
/** Initialize log4rs from the config directory's log4rs.yml if there is one,
 * otherwise log to the console at info level, or debug level when debug is
 * turned on.
 */
pub fn init_log(debug: bool) -> Result<()> {
    let logconfig = init_log_config();
    if Path::new(&logconfig).exists() {
        if let Err(e) = log4rs::init_file(&logconfig, Default::default()) {
            return Err(anyhow!("{}: {}", Errors::Log4rsInitialization(logconfig), e));
        }
        info!("Log4rs initialized using: {}", logconfig);
        return Ok(());
    }

    let level = if debug {LevelFilter::Debug} else {LevelFilter::Info};
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|e| anyhow!("{}: {}", Errors::Log4rsInitialization(logconfig.clone()), e))?;
    log4rs::init_config(config)
        .map_err(|e| anyhow!("{}: {}", Errors::Log4rsInitialization(logconfig.clone()), e))?;
    info!("Log4rs console logging initialized at level {}; no file at {}.", level, logconfig);
    Ok(())
}

// ---------------------------------------------------------------------------
// init_log_config:
// ---------------------------------------------------------------------------
fn init_log_config() -> String {
    MEME_DIRS.config_dir.clone() + LOG4RS_CONFIG_FILE
}

// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Retrieve the application parameters from the configuration file in the
 * config directory.  If the file doesn't exist, default values are used.
 * Logging isn't up yet, so progress is printed.
 */
fn get_parms() -> Result<Parms> {
    let config_file = get_absolute_path(&(MEME_DIRS.config_dir.clone() + MEME_CONFIG_FILE));
    println!("{}", Errors::ReadingConfigFile(config_file.clone()));
    let contents = match fs::read_to_string(&config_file) {
        Ok(c) => c,
        Err(_) => {
            println!("Unable to read configuration at {}. Using default values.", config_file);
            let config = Config::new().apply_args(&MEME_ARGS);
            return Ok(Parms { config_file: Default::default(), config });
        }
    };

    let config = parse_config(&contents, &config_file)?.apply_args(&MEME_ARGS);
    Ok(Parms { config_file, config })
}

// ---------------------------------------------------------------------------
// parse_config:
// ---------------------------------------------------------------------------
/** Parse and validate toml configuration text.  Missing fields take their
 * default values.
 */
pub fn parse_config(contents: &str, source: &str) -> Result<Config> {
    let config : Config = match toml::from_str(contents) {
        Ok(c)  => c,
        Err(e) => {
            let msg = format!("{}\n   {}", Errors::TOMLParseError(source.to_string()), e);
            // Logging isn't initialized while the configuration is read.
            println!("{}", msg);
            return Result::Err(anyhow!(msg));
        }
    };
    config.validate()?;
    Ok(config)
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context() -> RuntimeCtx {
    // The application aborts if the configuration can't be read.
    let parms = match get_parms() {
        Ok(p) => p,
        Err(e) => panic!("FAILED to read configuration file: {}", e),
    };
    RuntimeCtx {parms, meme_args: &MEME_ARGS, meme_dirs: &MEME_DIRS}
}
