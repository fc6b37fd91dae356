// =============================================================================
// Trigger Authentication — optional Bearer token
// =============================================================================
//
// When `SCANNER_TRIGGER_TOKEN` is configured, the trigger route requires
// `Authorization: Bearer <token>`. Comparison is constant-time. Without a
// configured token the route is open, matching a plain cron-style webhook.
//
//   async fn handler(_auth: TriggerAuth, ...) { ... }
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

/// Compare two byte slices in constant time.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Extractor that passes when no trigger token is configured or the request
/// carries the right one.
pub struct TriggerAuth;

/// Rejection returned when authentication fails.
pub struct AuthRejection {
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for TriggerAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.trigger_token.as_deref() else {
            return Ok(TriggerAuth);
        };

        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match token {
            Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
                Ok(TriggerAuth)
            }
            Some(_) => {
                warn!("invalid trigger token presented");
                Err(AuthRejection {
                    message: "Invalid authorization token",
                })
            }
            None => {
                warn!("missing or malformed Authorization header on trigger");
                Err(AuthRejection {
                    message: "Missing or invalid authorization token",
                })
            }
        }
    }
}
