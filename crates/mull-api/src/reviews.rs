//! Handlers for review endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/:user/reviews/today` | Optional `category`, `as_of` |
//! | `POST` | `/users/:user/reviews/complete` | Body: [`CompleteBody`] |
//! | `GET`  | `/users/:user/reviews/history` | Optional `content_id`; newest first |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use mull_core::{
  policy::TierProvider,
  review::{NewReview, ReviewOutcome, ReviewResult},
  schedule::Schedule,
  store::{DueQuery, ScheduleStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Today ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TodayParams {
  /// Restrict to schedules whose content carries this category.
  pub category: Option<String>,
  /// Point in time to evaluate due-ness against. Defaults to now.
  pub as_of:    Option<DateTime<Utc>>,
}

/// `GET /users/:user/reviews/today[?category=...][&as_of=...]`
pub async fn today<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(user_id): Path<Uuid>,
  Query(params): Query<TodayParams>,
) -> Result<Json<Vec<Schedule>>, ApiError>
where
  S: ScheduleStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = DueQuery {
    as_of:            params.as_of,
    category:         params.category,
    unreviewed_since: None,
  };
  let due = state
    .store
    .due_schedules(user_id, &query)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(due))
}

// ─── Complete ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /users/:user/reviews/complete`.
#[derive(Debug, Deserialize)]
pub struct CompleteBody {
  pub content_id:      Uuid,
  pub result:          ReviewResult,
  pub time_spent_secs: Option<u32>,
  pub notes:           Option<String>,
}

/// What the caller gets back: where the schedule landed.
#[derive(Debug, Serialize)]
pub struct CompletedReview {
  pub next_review_date: DateTime<Utc>,
  pub interval_index:   usize,
}

/// `POST /users/:user/reviews/complete`
///
/// Validation failures surface before any mutation; the schedule row is
/// left untouched by a rejected call.
pub async fn complete<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(user_id): Path<Uuid>,
  Json(body): Json<CompleteBody>,
) -> Result<Json<CompletedReview>, ApiError>
where
  S: ScheduleStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: TierProvider,
{
  let review = NewReview {
    content_id:      body.content_id,
    result:          body.result,
    time_spent_secs: body.time_spent_secs,
    notes:           body.notes,
  };
  review
    .validate()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  if state
    .store
    .get_schedule(user_id, review.content_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .is_none()
  {
    return Err(ApiError::NotFound(format!(
      "no schedule for content {}",
      review.content_id
    )));
  }

  let tier = state.tiers.current_tier(user_id).await;
  let policy = state.policies.policy_for(tier);

  let (schedule, _outcome) = state
    .store
    .complete_review(user_id, review, policy)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(CompletedReview {
    next_review_date: schedule.next_review_date,
    interval_index:   schedule.interval_index,
  }))
}

// ─── History ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub content_id: Option<Uuid>,
}

/// `GET /users/:user/reviews/history[?content_id=...]`
pub async fn history<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(user_id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ReviewOutcome>>, ApiError>
where
  S: ScheduleStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let outcomes = state
    .store
    .outcomes(user_id, params.content_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(outcomes))
}
