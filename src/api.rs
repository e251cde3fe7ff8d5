#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::http::Method;
use poem::middleware::Cors;
use poem::{EndpointExt, IntoEndpoint, Route};
use poem_openapi::OpenApiService;

use crate::utils::catalog::CategoryTable;
use crate::utils::config::Config;
use crate::utils::shaping::LatencyRange;

use self::generate_meme::GenerateMemeApi;
use self::health::HealthApi;

pub mod generate_meme;
pub mod health;

// The version of the generated openapi document.
const OPENAPI_VERSION: &str = "1.0.0";

// ***************************************************************************
//                               MemeCtx
// ***************************************************************************
/** Read-only state shared by every request handler.  It's built once at
 * startup and never changes, so handlers share it without locking.
 */
#[derive(Debug)]
pub struct MemeCtx {
    pub table: CategoryTable,
    pub latency: LatencyRange,
}

impl MemeCtx {
    pub fn new(table: CategoryTable, latency: LatencyRange) -> Self {
        Self {table, latency}
    }
}

// ---------------------------------------------------------------------------
// build_app:
// ---------------------------------------------------------------------------
/** Assemble the route tree.  Only the meme route is throttled and only it
 * carries the cross-origin policy; health and the openapi documents are
 * served as is.
 */
pub fn build_app(ctx: Arc<MemeCtx>, config: &Config, server_url: &str) -> Route {
    let endpoints = (GenerateMemeApi::new(ctx.clone()), HealthApi::new(ctx));
    let api_service =
        OpenApiService::new(endpoints, config.title.as_str(), OPENAPI_VERSION).server(server_url);

    // Allow the generated openapi specs to be retrieved from the server.
    let spec = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();
    let ui = api_service.swagger_ui();

    // The service routes on the full path, so one instance can back both routes.
    let api = Arc::new(api_service.into_endpoint());

    Route::new()
        .at("/generate-meme", api.clone().with(config.throttle()).with(make_cors(config)))
        .at("/health", api)
        .nest("/docs", ui)
        .at("/spec", spec)
        .at("/spec_yaml", spec_yaml)
}

// ---------------------------------------------------------------------------
// make_cors:
// ---------------------------------------------------------------------------
fn make_cors(config: &Config) -> Cors {
    let mut cors = Cors::new()
        .allow_method(Method::POST)
        .allow_header("Content-Type");
    for origin in &config.allowed_origins {
        cors = cors.allow_origin(origin.as_str());
    }
    cors
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use poem::http::StatusCode;
    use poem::test::{TestClient, TestResponse};
    use serde_json::{json, Value};
    use std::time::{Duration, Instant};

    const SERVER_URL: &str = "http://localhost:5000";

    fn test_client() -> TestClient<Route> {
        shaped_client(0, 0)
    }

    fn shaped_client(max_requests_per_minute: u32, latency_ms: u64) -> TestClient<Route> {
        let config = Config {max_requests_per_minute, ..Config::new()};
        let latency = LatencyRange::new(latency_ms, latency_ms).unwrap();
        let ctx = MemeCtx::new(CategoryTable::builtin().unwrap(), latency);
        TestClient::new(build_app(Arc::new(ctx), &config, SERVER_URL))
    }

    async fn json_body(resp: TestResponse) -> Value {
        let text = resp.0.into_body().into_string().await.unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn only_meme_route_is_delayed() {
        // 300 per minute spaces requests 200ms apart, plus 50ms of latency.
        let cli = shaped_client(300, 50);

        let start = Instant::now();
        let resp = cli.post("/generate-meme").body_json(&json!({"topic": "life"})).send().await;
        resp.assert_status_is_ok();
        assert!(start.elapsed() >= Duration::from_millis(250));

        let start = Instant::now();
        let resp = cli.get("/health").send().await;
        resp.assert_status_is_ok();
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn rejected_topic_skips_latency() {
        let cli = shaped_client(0, 300);
        let start = Instant::now();
        let resp = cli.post("/generate-meme").body_json(&json!({"topic": ""})).send().await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert!(start.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn coding_topic() {
        let cli = test_client();
        let table = CategoryTable::builtin().unwrap();
        let coding = &table.get("coding").unwrap().captions;

        for _ in 0..20 {
            let resp = cli.post("/generate-meme").body_json(&json!({"topic": "coding"})).send().await;
            resp.assert_status_is_ok();
            let body = json_body(resp).await;
            assert_eq!(body["category"], "coding");
            assert_eq!(body["success"], true);
            let text = body["meme_text"].as_str().unwrap().to_string();
            assert!(coding.contains(&text));
        }
    }

    #[tokio::test]
    async fn prefix_topic() {
        let cli = test_client();
        let resp = cli.post("/generate-meme").body_json(&json!({"topic": "cod"})).send().await;
        resp.assert_status_is_ok();
        assert_eq!(json_body(resp).await["category"], "coding");
    }

    #[tokio::test]
    async fn unknown_topic_falls_back() {
        let cli = test_client();
        let resp = cli.post("/generate-meme").body_json(&json!({"topic": "Quantum Pizza"})).send().await;
        resp.assert_status_is_ok();
        assert_eq!(json_body(resp).await["category"], "random");
    }

    #[tokio::test]
    async fn missing_topic_is_random() {
        let cli = test_client();
        let resp = cli.post("/generate-meme").body_json(&json!({})).send().await;
        resp.assert_status_is_ok();
        assert_eq!(json_body(resp).await["category"], "random");
    }

    #[tokio::test]
    async fn blank_topic_rejected() {
        let cli = test_client();
        for topic in [json!(""), json!("   "), json!(null), json!(12), json!("x".repeat(101))] {
            let resp = cli.post("/generate-meme").body_json(&json!({"topic": topic})).send().await;
            resp.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(json_body(resp).await, json!({"error": "Invalid topic format"}));
        }
    }

    #[tokio::test]
    async fn topic_length_boundary() {
        let cli = test_client();
        let resp = cli.post("/generate-meme").body_json(&json!({"topic": "c".repeat(100)})).send().await;
        resp.assert_status_is_ok();
    }

    #[tokio::test]
    async fn non_json_rejected() {
        let cli = test_client();
        let resp = cli.post("/generate-meme").content_type("text/plain").body("coding").send().await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await, json!({"error": "Request must be JSON"}));

        let resp = cli.post("/generate-meme").content_type("application/json").body("{topic:").send().await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await, json!({"error": "Request must be JSON"}));

        let resp = cli.post("/generate-meme").body_json(&json!(["coding"])).send().await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await, json!({"error": "Request must be JSON"}));
    }

    #[tokio::test]
    async fn health_lists_categories_in_order() {
        let cli = test_client();
        let resp = cli.get("/health").send().await;
        resp.assert_status_is_ok();
        assert_eq!(json_body(resp).await, json!({
            "status": "healthy",
            "version": "1.0.0",
            "categories": ["coding", "exam", "life", "relationships", "random"],
        }));
    }

    #[tokio::test]
    async fn cors_preflight_for_dev_origin() {
        let cli = test_client();
        let resp = cli.options("/generate-meme")
            .header("Origin", "http://localhost:5173")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_header("access-control-allow-origin", "http://localhost:5173");
    }

    #[tokio::test]
    async fn cors_rejects_other_origins() {
        let cli = test_client();
        let resp = cli.options("/generate-meme")
            .header("Origin", "http://example.com")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await;
        assert!(resp.0.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn post_from_other_origin_is_forbidden() {
        let cli = test_client();
        let resp = cli.post("/generate-meme")
            .header("Origin", "http://example.com")
            .body_json(&json!({"topic": "coding"}))
            .send()
            .await;
        resp.assert_status(StatusCode::FORBIDDEN);

        // Requests without an Origin header aren't subject to the policy.
        let resp = cli.post("/generate-meme").body_json(&json!({"topic": "coding"})).send().await;
        resp.assert_status_is_ok();
    }

    #[tokio::test]
    async fn spec_is_served() {
        let cli = test_client();
        let resp = cli.get("/spec").send().await;
        resp.assert_status_is_ok();
        let spec = json_body(resp).await;
        assert!(spec["paths"].get("/generate-meme").is_some());
        assert!(spec["paths"].get("/health").is_some());
    }
}
