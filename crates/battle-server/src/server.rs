use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use battle_core::ids::SessionId;

use crate::error::ApiError;
use crate::event_bridge;
use crate::orchestrator::{DebateOrchestrator, StartDebate};

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".into(),
                "http://127.0.0.1:5173".into(),
            ],
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<dyn DebateOrchestrator>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/models", get(models_handler))
        .route("/debate/start", post(start_handler))
        .route("/debate/{session_id}/stream", get(stream_handler))
        .route("/debate/{session_id}/stop", post(stop_handler))
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Credentialed CORS for the listed origins; `*` allows any origin without
/// credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Bind and serve in the background. Returns a handle holding the task.
pub async fn start(
    config: ServerConfig,
    orchestrator: Arc<dyn DebateOrchestrator>,
) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(AppState { orchestrator }, &config.cors_origins);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;

    tracing::info!(%addr, "battle server started");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "server stopped");
        }
    });

    Ok(ServerHandle {
        addr,
        port: addr.port(),
        _server: server,
    })
}

/// Handle returned by `start()`; dropping it leaves the server running
/// until the runtime shuts down.
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn shutdown(self) {
        self._server.abort();
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn models_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.orchestrator.models())
}

async fn start_handler(
    State(state): State<AppState>,
    body: Result<Json<StartDebate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::Unprocessable(e.body_text()))?;
    let started = state.orchestrator.start(request).await?;
    Ok(Json(started))
}

async fn stream_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.orchestrator.stream(&SessionId::from_raw(session_id))?;
    Ok(Sse::new(event_bridge::sse_stream(events)).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE)))
}

async fn stop_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = SessionId::from_raw(session_id);
    state.orchestrator.stop(&session_id)?;
    Ok(Json(json!({ "session_id": session_id, "status": "stopped" })))
}
