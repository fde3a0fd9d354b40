//! HTTP front door
//!
//! Axum router exposing the chat forwarder and a liveness probe. Every
//! response carries permissive CORS headers; preflight is answered by the
//! CORS layer. Core failures are translated to a structured JSON error
//! body; nothing crosses the transport boundary uncaught.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{CLIENT_ID_VAR, CLIENT_SECRET_VAR, Config};
use crate::forwarder::{ChatAnswer, ChatForwarder};
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Chat forwarder
    pub forwarder: ChatForwarder,
}

/// Chat request body
#[derive(Debug, Default, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

/// Success response body: `{"status":"success"}` plus the flattened answer
#[derive(Debug, Serialize)]
struct SuccessBody {
    status: &'static str,
    #[serde(flatten)]
    answer: ChatAnswer,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/chatcbi",
            post(chat_handler).fallback(method_not_allowed_handler),
        )
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness handler. A fixed payload with no dependency checks: this
/// probes transport reachability, not upstream health.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "CB Insights proxy server is running",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Chat handler (POST /api/chatcbi)
async fn chat_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // A missing, malformed, or message-less body all fail the same gate
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();
    if request.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "msg": "Message is required" })),
        )
            .into_response();
    }

    info!(chars = request.message.len(), "received question");

    match state.forwarder.forward(&request.message).await {
        Ok(answer) => success_response(answer),
        Err(err) => error_response(&err),
    }
}

/// JSON 405 for non-POST methods on the chat endpoint
async fn method_not_allowed_handler() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "status": "error", "msg": "Method not allowed" })),
    )
}

fn success_response(answer: ChatAnswer) -> Response {
    (
        StatusCode::OK,
        Json(SuccessBody {
            status: "success",
            answer,
        }),
    )
        .into_response()
}

/// Map a core failure to its HTTP status and `{status:"error"}` body.
/// Validation bodies carry only a message; everything else also echoes
/// the numeric code.
fn error_response(err: &Error) -> Response {
    let status = err.http_status();
    let body = match err {
        Error::Validation(msg) => json!({ "status": "error", "msg": msg }),
        _ => json!({
            "status": "error",
            "code": status.as_u16(),
            "msg": err.to_string(),
        }),
    };
    warn!(code = status.as_u16(), error = %err, "request failed");
    (status, Json(body)).into_response()
}

/// The proxy server
pub struct ProxyServer {
    config: Config,
}

impl ProxyServer {
    /// Create a server from configuration
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Bind and serve until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if the host is invalid or the listener cannot bind.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let forwarder = ChatForwarder::from_config(&self.config);
        let has_credentials = forwarder.has_credentials();
        let state = Arc::new(AppState { forwarder });
        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("CBI PROXY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = self.config.server.port, "Listening");
        info!(
            "  GET  http://{}:{}/health",
            self.config.server.host, self.config.server.port
        );
        info!(
            "  POST http://{}:{}/api/chatcbi",
            self.config.server.host, self.config.server.port
        );
        info!(upstream = %self.config.upstream.base_url, "Forwarding to");
        if !has_credentials {
            warn!(
                "CB Insights credentials not found - set {CLIENT_ID_VAR} and {CLIENT_SECRET_VAR}"
            );
        }
        info!("============================================================");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
