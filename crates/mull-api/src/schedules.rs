//! Handlers for schedule lifecycle endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/schedules` | Content-creation hook; body: [`CreateBody`] |
//! | `GET`   | `/users/:user/schedules` | All schedules, active or not |
//! | `PATCH` | `/users/:user/schedules/:content/active` | Body: `{"active":bool}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mull_core::{schedule::Schedule, store::ScheduleStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /schedules`, issued by the content service
/// when a piece of content is created.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id:    Uuid,
  pub content_id: Uuid,
  pub category:   Option<String>,
}

/// `POST /schedules` — returns 201 + the stored [`Schedule`].
pub async fn create<S, T>(
  State(state): State<ApiState<S, T>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ScheduleStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if state
    .store
    .get_schedule(body.user_id, body.content_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .is_some()
  {
    return Err(ApiError::Conflict(format!(
      "content {} already has a schedule",
      body.content_id
    )));
  }

  let schedule = state
    .store
    .create_schedule(body.user_id, body.content_id, body.category)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(schedule)))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /users/:user/schedules`
pub async fn list<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Schedule>>, ApiError>
where
  S: ScheduleStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let schedules = state
    .store
    .list_schedules(user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(schedules))
}

// ─── Activate / deactivate ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `PATCH /users/:user/schedules/:content/active` — body: `{"active":false}`
pub async fn set_active<S, T>(
  State(state): State<ApiState<S, T>>,
  Path((user_id, content_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<Schedule>, ApiError>
where
  S: ScheduleStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if state
    .store
    .get_schedule(user_id, content_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .is_none()
  {
    return Err(ApiError::NotFound(format!(
      "no schedule for content {content_id}"
    )));
  }

  let schedule = state
    .store
    .set_active(user_id, content_id, body.active)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(schedule))
}
