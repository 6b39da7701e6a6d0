//! HTTP gateway server built on axum.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::GatewayConfig;
use crate::dispatcher::Dispatcher;
use crate::envelope::{ActionEvent, handle_event};

/// Router state. The mutex keeps one `/invoke` in flight at a time; the
/// bucket name is held outside it so `/health` never waits on a model call.
#[derive(Clone)]
pub struct SharedDispatcher {
    dispatcher: Arc<Mutex<Dispatcher>>,
    bucket: Arc<str>,
}

/// Wrap a dispatcher for use with [`router`].
pub fn shared(dispatcher: Dispatcher) -> SharedDispatcher {
    SharedDispatcher {
        bucket: Arc::from(dispatcher.store_config().bucket.as_str()),
        dispatcher: Arc::new(Mutex::new(dispatcher)),
    }
}

/// Build an axum Router with `/invoke` and `/health` routes.
pub fn router(shared: SharedDispatcher) -> Router {
    Router::new()
        .route("/invoke", post(invoke_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Action handler endpoint.
///
/// Envelope status codes travel inside the body; the HTTP status is 200 for
/// every envelope. A request missing required parameters gets a 400 with a
/// plain error object instead of an envelope.
async fn invoke_handler(
    State(state): State<SharedDispatcher>,
    Json(event): Json<ActionEvent>,
) -> Response {
    let dispatcher = state.dispatcher.lock().await;
    match handle_event(&dispatcher, &event).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            warn!(error = %e, "Rejected malformed action request");
            let body = serde_json::json!({ "error": e.to_string() });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
    }
}

/// Health check endpoint.
async fn health_handler(State(state): State<SharedDispatcher>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "bucket": &*state.bucket,
    });
    Json(body)
}

/// Start the gateway on the configured address.
///
/// This is an async function that runs until cancelled.
pub async fn run(shared: SharedDispatcher, config: &GatewayConfig) -> Result<(), std::io::Error> {
    let app = router(shared);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = addr.as_str(), "Gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
