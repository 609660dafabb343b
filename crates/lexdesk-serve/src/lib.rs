use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lexdesk_ai::{AiError, CompletionClient, Generation};
use lexdesk_core::AnalysisResult;

// ── Config ──

pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

// ── Server State ──

struct ServerState {
    /// `None` when no upstream credential is configured.
    client: Option<Arc<dyn CompletionClient>>,
}

// ── Error Handling ──

/// A failed request, rendered as `{ "error": message }`.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("request task failed: {err}"),
        }
    }
}

// ── Entrypoint ──

pub async fn serve(
    config: ServeConfig,
    client: Option<Arc<dyn CompletionClient>>,
) -> anyhow::Result<()> {
    if client.is_none() {
        warn!("OPENAI_API_KEY is not set; AI routes will answer 400");
    }
    let app = router(client);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "lexdesk HTTP server listening");
    eprintln!("lexdesk HTTP server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router (for testing without binding to a port).
pub fn router(client: Option<Arc<dyn CompletionClient>>) -> Router {
    let state = Arc::new(ServerState { client });
    Router::new()
        .route("/api/health", get(health))
        .route("/api/ai/generate", post(post_generate))
        .route("/api/ai/analyze", post(post_analyze))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──

async fn health(State(state): State<Arc<ServerState>>) -> Json<Value> {
    Json(serde_json::json!({ "ok": true, "ai": state.client.is_some() }))
}

/// A string field of the request body; anything else counts as missing.
fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

// ── POST /api/ai/generate ──

async fn post_generate(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Generation>, ApiError> {
    let Json(body) = body?;
    let prompt = string_field(&body, "prompt");
    let system = string_field(&body, "system");
    let client = state.client.clone();

    let generation = tokio::task::spawn_blocking(move || {
        lexdesk_ai::generate(client.as_deref(), prompt.as_deref(), system.as_deref())
    })
    .await??;
    Ok(Json(generation))
}

// ── POST /api/ai/analyze ──

async fn post_analyze(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(body) = body?;
    let text = string_field(&body, "text");
    let client = state.client.clone();

    let analysis =
        tokio::task::spawn_blocking(move || lexdesk_ai::analyze(client.as_deref(), text.as_deref()))
            .await??;
    Ok(Json(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use lexdesk_ai::{CompletionRequest, UpstreamError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct FakeClient {
        reply: Result<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl FakeClient {
        fn new(reply: Result<&'static str, &'static str>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl CompletionClient for FakeClient {
        fn complete(&self, _request: &CompletionRequest) -> Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .map_err(|message| UpstreamError::Status {
                    status: 503,
                    message: message.to_string(),
                })
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    fn app_with(fake: &Arc<FakeClient>) -> Router {
        let client: Arc<dyn CompletionClient> = fake.clone();
        router(Some(client))
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ai_availability() {
        let resp = router(None)
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["ai"], false);
    }

    #[tokio::test]
    async fn analyze_without_credential_is_400() {
        let (status, json) = post_json(
            router(None),
            "/api/ai/analyze",
            r#"{"text":"NDA between A and B..."}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn analyze_normalizes_prose_wrapped_json() {
        let fake = FakeClient::new(Ok(
            r#"Sure! {"summary":"Mutual NDA.","risks":["No term"],"clauses":[{"name":"Confidentiality","excerpt":"shall not disclose"}]} Hope this helps."#,
        ));
        let (status, json) =
            post_json(app_with(&fake), "/api/ai/analyze", r#"{"text":"NDA text"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"], "Mutual NDA.");
        assert_eq!(json["risks"][0], "No term");
        assert_eq!(json["clauses"][0]["name"], "Confidentiality");
        assert_eq!(json["recommendations"], serde_json::json!([]));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn analyze_rejects_non_string_text_without_calling_upstream() {
        let fake = FakeClient::new(Ok("unused"));
        let (status, json) =
            post_json(app_with(&fake), "/api/ai/analyze", r#"{"text":42}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing text (string)");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generate_returns_text() {
        let fake = FakeClient::new(Ok("NON-DISCLOSURE AGREEMENT\n..."));
        let (status, json) = post_json(
            app_with(&fake),
            "/api/ai/generate",
            r#"{"prompt":"Draft an NDA","system":"You are a lawyer"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["text"], "NON-DISCLOSURE AGREEMENT\n...");
    }

    #[tokio::test]
    async fn generate_without_prompt_is_400() {
        let fake = FakeClient::new(Ok("unused"));
        let (status, json) = post_json(app_with(&fake), "/api/ai/generate", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing prompt");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_500_with_message() {
        let fake = FakeClient::new(Err("The model is overloaded"));
        let (status, json) =
            post_json(app_with(&fake), "/api/ai/generate", r#"{"prompt":"hi"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "The model is overloaded");
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let (status, json) = post_json(router(None), "/api/ai/analyze", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }
}
