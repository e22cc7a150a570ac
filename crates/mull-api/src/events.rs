//! Handler for inbound collaborator events.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/events/tier-change` | Billing webhook; body: [`TierChange`] |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use mull_core::policy::TierChange;

use crate::{ApiState, error::ApiError};

/// `POST /events/tier-change` — body: `{"user_id":"...","tier":"basic"}`
///
/// Accepted, not applied: reconciliation runs off the request path so the
/// billing transaction is never blocked on schedule rewrites.
pub async fn tier_change<S, T>(
  State(state): State<ApiState<S, T>>,
  Json(change): Json<TierChange>,
) -> Result<impl IntoResponse, ApiError> {
  state
    .tier_events
    .send(change)
    .await
    .map_err(|e| ApiError::Unavailable(e.to_string()))?;
  Ok(StatusCode::ACCEPTED)
}
