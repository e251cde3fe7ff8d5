#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, Object, ApiResponse };
use serde_json::Value;
use log::{error, info};
use rand::Rng;

use crate::api::MemeCtx;
use crate::utils::catalog::CategoryTable;
use crate::utils::errors::{Errors, HttpError};
use crate::utils::meme_utils::{self, RequestDebug};
use crate::utils::resolver::resolve;
use crate::utils::selector::select;
use crate::utils::shaping::{simulate_latency, validate_topic};

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct GenerateMemeApi {
    ctx: Arc<MemeCtx>,
}

impl GenerateMemeApi {
    pub fn new(ctx: Arc<MemeCtx>) -> Self {
        Self {ctx}
    }
}

// The validated request.  The wire body is taken as raw json so that a
// non-string topic is reported the same way as any other invalid topic.
#[derive(Debug)]
struct ReqGenerateMeme
{
    topic: String,
}

#[derive(Object, Debug)]
struct RespGenerateMeme
{
    meme_text: String,
    category: String,
    success: bool,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqGenerateMeme {
    fn get_request_info(&self) -> String {
        format!("  Request body:\n    topic: {}\n", self.topic)
    }
}

impl ReqGenerateMeme {
    fn from_body(body: &Value) -> Result<Self, Errors> {
        let fields = match body.as_object() {
            Some(f) => f,
            None => return Err(Errors::MalformedRequest("body is not a json object".to_string())),
        };
        Ok(Self {topic: validate_topic(fields.get("topic"))?})
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
#[oai(bad_request_handler = "bad_request_handler")]
enum MemeResponse {
    #[oai(status = 200)]
    Http200(Json<RespGenerateMeme>),
    #[oai(status = 400)]
    Http400(Json<HttpError>),
}

fn make_http_200(resp: RespGenerateMeme) -> MemeResponse {
    MemeResponse::Http200(Json(resp))
}
fn make_http_400(e: &Errors) -> MemeResponse {
    MemeResponse::Http400(Json(HttpError::from(e)))
}

// Bodies that aren't json, or aren't labeled as json, never reach the handler.
fn bad_request_handler(err: poem::Error) -> MemeResponse {
    let e = Errors::MalformedRequest(err.to_string());
    info!("{}", e);
    make_http_400(&e)
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl GenerateMemeApi {
    /// Return a random caption for the category that best matches the topic.
    #[oai(path = "/generate-meme", method = "post")]
    async fn generate_meme(&self, http_req: &Request, body: Json<Value>) -> MemeResponse {
        let resp = match RespGenerateMeme::process(http_req, &body.0, &self.ctx.table) {
            Ok(r) => r,
            Err(e) => {
                info!("Rejected meme request: {}", e);
                return make_http_400(&e);
            }
        };

        // Emulate a slower backend.
        simulate_latency(self.ctx.latency).await;

        make_http_200(resp)
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespGenerateMeme {
    fn new(meme_text: String, category: String) -> Self {
        Self {meme_text, category, success: true}
    }

    fn process(http_req: &Request, body: &Value, table: &CategoryTable) -> Result<Self, Errors> {
        let req = ReqGenerateMeme::from_body(body)?;

        // Conditional logging depending on log level.
        meme_utils::debug_request(http_req, &req);

        let category = resolve(&req.topic, table);
        let (category, caption) = pick_caption(category, table);

        info!("Meme generated for topic: {} (resolved category: {})", req.topic, category);
        Ok(Self::new(caption, category))
    }
}

// ***************************************************************************
//                          Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// pick_caption:
// ---------------------------------------------------------------------------
/** Select a caption from the resolved category.  The resolver only returns
 * names from the table, so a failure here is a bug: it asserts in debug
 * builds and answers from the default category in release builds.  The
 * category actually used is returned with the caption.
 */
fn pick_caption(category: &str, table: &CategoryTable) -> (String, String) {
    let mut rng = rand::thread_rng();
    match select(category, table, &mut rng) {
        Ok(caption) => (category.to_string(), caption.to_string()),
        Err(e) => {
            error!("{}", e);
            debug_assert!(false, "{}", e);
            fallback_caption(table, &mut rng)
        }
    }
}

// ---------------------------------------------------------------------------
// fallback_caption:
// ---------------------------------------------------------------------------
/** Answer from the table's default category. */
fn fallback_caption<R: Rng + ?Sized>(table: &CategoryTable, rng: &mut R) -> (String, String) {
    let default = table.default_name();
    let caption = select(default, table, rng)
        .map(str::to_string)
        .unwrap_or_default();
    (default.to_string(), caption)
}
