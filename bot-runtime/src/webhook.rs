//! Webhook ingestion: one POST carries one update.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tbot_api::Update;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Router state: the queue feeding the webhook's dispatch task.
#[derive(Clone)]
pub struct WebhookState {
    pub tx: mpsc::Sender<Update>,
}

pub(crate) fn router(path: &str, state: WebhookState) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    Router::new()
        .route(&path, post(receive_update))
        .with_state(state)
}

/// Decodes the payload and queues it. Undecodable payloads are acknowledged with 200 so the API
/// does not redeliver them.
pub(crate) async fn receive_update(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, len = body.len(), "Malformed webhook payload dropped");
            return StatusCode::OK;
        }
    };
    debug!(update_id = update.update_id, kind = update.kind.name(), "Webhook update received");

    if state.tx.send(update).await.is_err() {
        error!("Webhook dispatch task is gone");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}
