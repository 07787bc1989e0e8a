//! Webhook shim
//!
//! A small axum surface Telegram posts updates to when the bot runs in
//! webhook mode instead of long polling:
//!
//! - `GET  /webhook` health probe (environment label, never credentials)
//! - `POST /webhook` update intake
//!
//! Intake validates `X-Telegram-Bot-Api-Secret-Token` with a constant-time
//! comparison (401 on mismatch), rejects undecodable bodies with 400, and
//! queues decoded updates onto a channel the dispatch loop drains. Handler
//! failures never surface here; Telegram retries non-2xx deliveries and a
//! poisoned update must not be redelivered forever.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use teloxide::types::Update;
use tokio::sync::mpsc;

use crate::core::config;

pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

#[derive(Clone)]
pub struct WebhookState {
    /// Expected secret token. `None` accepts every request (logged at startup).
    pub secret: Option<String>,
    pub updates: mpsc::Sender<Update>,
}

pub fn webhook_router(state: WebhookState) -> Router {
    Router::new().route("/webhook", get(health).post(receive_update)).with_state(state)
}

/// Liveness probe. Reports configuration as booleans, never values.
async fn health(State(state): State<WebhookState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "environment": config::environment_label(),
        "secret_configured": state.secret.is_some(),
        "admins_configured": !config::ADMIN_IDS.is_empty(),
    }))
}

async fn receive_update(State(state): State<WebhookState>, headers: HeaderMap, body: String) -> impl IntoResponse {
    if let Some(expected) = state.secret.as_deref() {
        let presented = headers.get(SECRET_TOKEN_HEADER).and_then(|v| v.to_str().ok()).unwrap_or("");
        if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            log::warn!("Webhook request rejected: secret token mismatch");
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    }

    let update: Update = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            log::warn!("Webhook request rejected: undecodable update ({})", e);
            return (StatusCode::BAD_REQUEST, "bad request").into_response();
        }
    };

    // A full queue means the dispatcher is wedged or drowning; dropping the
    // update lets Telegram redeliver it later.
    if let Err(e) = state.updates.try_send(update) {
        log::error!("Webhook update queue unavailable: {}", e);
        return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
    }

    StatusCode::OK.into_response()
}

/// Byte comparison whose duration does not depend on where the inputs
/// diverge. Length still leaks, which is fine for a shared secret.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
