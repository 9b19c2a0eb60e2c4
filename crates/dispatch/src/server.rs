use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value as JsonValue, json};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::DispatchConfig;
use crate::mail::{MailError, Mailer};
use crate::message::build_messages;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DispatchConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: DispatchConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config: Arc::new(config),
            mailer,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/send-email", post(send_email))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Error, Debug)]
enum SendError {
    #[error("request body is not JSON: {0}")]
    Body(#[from] serde_json::Error),

    #[error(transparent)]
    Mail(#[from] MailError),
}

/// The body is read raw so that malformed requests get the same JSON error
/// reply as delivery failures.
async fn send_email(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<JsonValue>) {
    match deliver(&state, &body).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Emails sent successfully" })),
        ),
        Err(err) => {
            error!(error = %err, "error sending emails");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to send emails" })),
            )
        }
    }
}

async fn deliver(state: &AppState, body: &[u8]) -> Result<(), SendError> {
    let snapshot: JsonValue = serde_json::from_slice(body)?;
    let messages = build_messages(&snapshot, &state.config)?;
    for message in &messages {
        state.mailer.send(message).await?;
    }
    info!(to = %messages[1].to, "request notifications sent");
    Ok(())
}
