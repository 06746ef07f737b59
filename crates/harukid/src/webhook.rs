//! Inbound webhook listener for catalog notifications

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use haruki_api::NotificationPayload;
use haruki_config::WebhookSettings;
use haruki_core::NotificationRelay;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct WebhookState {
    relay: Arc<NotificationRelay>,
    auth_token: Option<String>,
}

impl WebhookState {
    pub fn new(relay: Arc<NotificationRelay>, auth_token: Option<String>) -> Self {
        Self {
            relay,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        }
    }

    /// Accepts the bare token or `Bearer {token}`
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.auth_token else {
            return true;
        };
        let Some(given) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
        else {
            return false;
        };
        given == expected || given.strip_prefix("Bearer ").map(str::trim) == Some(expected.as_str())
    }
}

/// Router serving `POST {path}`; other methods get 405
pub fn router(path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(path, post(receive))
        .with_state(state)
}

async fn receive(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if !state.authorized(&headers) {
        warn!("Webhook request with bad credentials");
        return (StatusCode::UNAUTHORIZED, "unauthorized");
    }

    let payload: NotificationPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "Webhook body is not a notification");
            return (StatusCode::BAD_REQUEST, "invalid JSON");
        }
    };

    info!(
        event = %payload.event,
        subject = %payload.subject,
        "Webhook notification received"
    );
    let relay = state.relay.clone();
    tokio::spawn(async move {
        let outcome = relay.relay(payload).await;
        debug!(?outcome, "Webhook notification handled");
    });

    (StatusCode::OK, "ok")
}

/// Bind and serve until the task is dropped or aborted
pub async fn serve(settings: &WebhookSettings, relay: Arc<NotificationRelay>) -> std::io::Result<()> {
    let listener = TcpListener::bind(settings.listen).await?;
    info!(addr = %settings.listen, path = %settings.path, "Webhook listening");
    let app = router(&settings.path, WebhookState::new(relay, settings.auth_token.clone()));
    axum::serve(listener, app).await
}
