#![forbid(unsafe_code)]

use std::sync::Arc;

use poem_openapi::{ OpenApi, payload::Json, Object };
use log::debug;

use crate::api::MemeCtx;

// The published api version, independent of the crate's build version.
const API_VERSION: &str = "1.0.0";
const STATUS_HEALTHY: &str = "healthy";

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct HealthApi {
    ctx: Arc<MemeCtx>,
}

impl HealthApi {
    pub fn new(ctx: Arc<MemeCtx>) -> Self {
        Self {ctx}
    }
}

#[derive(Object, Debug)]
struct RespHealth
{
    status: String,
    version: String,
    categories: Vec<String>,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl HealthApi {
    /// Report liveness and the category names in declaration order.
    #[oai(path = "/health", method = "get")]
    async fn health(&self) -> Json<RespHealth> {
        debug!("Health check requested");
        Json(RespHealth::new(self.ctx.table.names()))
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespHealth {
    fn new(categories: Vec<String>) -> Self {
        Self {status: STATUS_HEALTHY.to_string(),
              version: API_VERSION.to_string(),
              categories,
        }
    }
}
