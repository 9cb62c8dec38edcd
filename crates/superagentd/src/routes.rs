//! HTTP routes.
//!
//! ## Endpoints
//!
//! - `GET  /api/health`          - Liveness and active provider
//! - `POST /api/plan`            - Architecture plan for an instruction
//! - `POST /api/build`           - Run the build pipeline (500 with the result on failure)
//! - `POST /api/generate/stream` - SSE stream of completion chunks
//! - `GET  /apps/*`              - Generated project previews

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use superagent_core::{planner, BuildRequest, CompletionRequest, CompletionStream, VERSION};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: &'static str,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub instruction: String,
    #[serde(default = "auto")]
    pub language: String,
    #[serde(default)]
    pub multi_file: bool,
}

fn auto() -> String {
    "auto".to_string()
}

#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    pub prompt: String,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let previews = ServiceBuilder::new()
        .layer(middleware::from_fn(hide_dot_paths))
        .service(ServeDir::new(&state.output_dir));
    Router::new()
        .route("/api/health", get(health))
        .route("/api/plan", post(plan))
        .route("/api/build", post(build))
        .route("/api/generate/stream", post(generate_stream))
        .nest_service("/apps", previews)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Previews never expose dot-prefixed entries such as `.superagent/`.
async fn hide_dot_paths(req: Request, next: Next) -> Response {
    if has_dot_segment(req.uri().path()) {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(req).await
}

fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let segment = segment.to_ascii_lowercase();
        segment.starts_with('.') || segment.starts_with("%2e")
    })
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        provider: state.client.provider(),
        model: state.client.model().to_string(),
    })
}

/// POST /api/plan
async fn plan(Json(req): Json<PlanRequest>) -> Response {
    if req.instruction.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "instruction must not be empty");
    }
    let architecture = planner::plan(&req.instruction, &req.language, req.multi_file);
    Json(architecture).into_response()
}

/// POST /api/build
async fn build(State(state): State<AppState>, Json(req): Json<BuildRequest>) -> Response {
    if let Err(e) = req.validate() {
        return error(StatusCode::BAD_REQUEST, e.to_string());
    }

    let result = state.pipeline.run(req).await;
    info!(build_id = %result.build_id, success = result.success, "build request finished");
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result)).into_response()
}

/// POST /api/generate/stream
async fn generate_stream(
    State(state): State<AppState>,
    Json(req): Json<StreamRequest>,
) -> Response {
    if req.prompt.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "prompt must not be empty");
    }

    let mut request = CompletionRequest::new(req.prompt);
    if let Some(system) = req.system {
        request = request.with_system(system);
    }
    if let Some(temperature) = req.temperature {
        request = request.with_temperature(temperature);
    }

    match state.client.complete_stream(request).await {
        Ok(chunks) => Sse::new(sse_events(chunks))
            .keep_alive(
                KeepAlive::new()
                    .interval(Duration::from_secs(15))
                    .text("ping"),
            )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "stream request failed");
            error(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// `chunk` events for each piece of text, then `done`. A failed chunk emits
/// `error` and ends the stream.
fn sse_events(chunks: CompletionStream) -> impl Stream<Item = Result<Event, Infallible>> {
    let body = chunks
        .scan(false, |failed, item| {
            if *failed {
                return futures::future::ready(None);
            }
            let event = match item {
                Ok(text) => Event::default().event("chunk").data(text),
                Err(e) => {
                    *failed = true;
                    Event::default().event("error").data(e.to_string())
                }
            };
            futures::future::ready(Some(event))
        });
    let done = stream::once(async { Event::default().event("done").data("[DONE]") });
    body.chain(done).map(Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use superagent_build::{
        BuildPipeline, BuildResult, BuildServices, PipelineSettings, RecordingRunner,
    };
    use superagent_core::{
        CodeGenerator, E2eVerifier, HeuristicCodeVerifier, PatternSecurityScanner,
        ProductionOutputs, ProjectMaterializer, ScriptedClient, UnavailableBrowser,
    };
    use tower::ServiceExt;

    fn app(dir: &std::path::Path, client: ScriptedClient) -> Router {
        let client = Arc::new(client);
        let services = BuildServices {
            generator: CodeGenerator::new(client.clone()),
            materializer: ProjectMaterializer::new(dir),
            checkpoints: None,
            runner: Arc::new(RecordingRunner::new()),
            verifier: E2eVerifier::new(
                Arc::new(UnavailableBrowser::new("no browser in tests")),
                Duration::from_secs(5),
            ),
            scanner: Arc::new(PatternSecurityScanner::new()),
            code_verifier: Arc::new(HeuristicCodeVerifier),
            production: ProductionOutputs,
        };
        let pipeline = BuildPipeline::new(services, PipelineSettings::default());
        router(AppState::new(pipeline, client))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), ScriptedClient::always("x"))
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"], "scripted");
    }

    #[tokio::test]
    async fn test_plan_returns_architecture() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), ScriptedClient::always("x"))
            .oneshot(post_json(
                "/api/plan",
                serde_json::json!({ "instruction": "build an advanced scientific calculator", "language": "html" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["multi_file"], true);
        assert_eq!(body["files_to_create"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_plan_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), ScriptedClient::always("x"))
            .oneshot(post_json("/api/plan", serde_json::json!({ "instruction": " " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_build_success_and_preview_served() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(
            dir.path(),
            ScriptedClient::always("<html><body><h1>Hello preview</h1></body></html>"),
        );

        let response = router
            .clone()
            .oneshot(post_json(
                "/api/build",
                serde_json::json!({ "instruction": "simple landing page", "language": "html" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let result: BuildResult = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(result.success);
        assert!(result.e2e_skipped);

        let preview = result.preview_url.unwrap();
        let response = router
            .oneshot(Request::get(preview.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Hello preview"));
    }

    #[test]
    fn test_dot_segments_detected() {
        assert!(has_dot_segment("/.superagent/checkpoints/manifests"));
        assert!(has_dot_segment("/app/%2Esecret"));
        assert!(has_dot_segment("/app/../other"));
        assert!(!has_dot_segment("/enterprise_todo_1/index.html"));
        assert!(!has_dot_segment("/"));
    }

    #[tokio::test]
    async fn test_previews_hide_checkpoint_state() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join(".superagent").join("checkpoints");
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state_dir.join("note.json"), "{}").unwrap();
        std::fs::create_dir_all(dir.path().join("enterprise_page_1")).unwrap();
        std::fs::write(dir.path().join("enterprise_page_1/index.html"), "<h1>ok</h1>").unwrap();

        let router = app(dir.path(), ScriptedClient::always("x"));
        let hidden = router
            .clone()
            .oneshot(
                Request::get("/apps/.superagent/checkpoints/note.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

        let shown = router
            .oneshot(
                Request::get("/apps/enterprise_page_1/index.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(shown.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failed_build_is_500_with_result() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), ScriptedClient::failing("quota exceeded"))
            .oneshot(post_json(
                "/api/build",
                serde_json::json!({ "instruction": "todo list app" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let result: BuildResult = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_generate_stream_emits_chunks_then_done() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), ScriptedClient::always("hello world"))
            .oneshot(post_json(
                "/api/generate/stream",
                serde_json::json!({ "prompt": "say hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("event: chunk\ndata: hello world"));
        assert!(body.contains("event: done"));
    }

    #[tokio::test]
    async fn test_generate_stream_upstream_failure_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), ScriptedClient::failing("down"))
            .oneshot(post_json(
                "/api/generate/stream",
                serde_json::json!({ "prompt": "say hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
