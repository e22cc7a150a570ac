//! The `ScheduleStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `mull-store-sqlite`).
//! Higher layers (`mull-api`, `mull-dispatch`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  policy::IntervalPolicy,
  review::{NewReview, ReviewOutcome},
  schedule::Schedule,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`ScheduleStore::due_schedules`].
#[derive(Debug, Clone, Default)]
pub struct DueQuery {
  /// Point in time to evaluate due-ness against; defaults to now.
  pub as_of:            Option<DateTime<Utc>>,
  /// Restrict to schedules whose content carries this category.
  pub category:         Option<String>,
  /// Exclude pairs with a review outcome recorded at or after this instant.
  /// The evening reminder bucket sets this to local midnight.
  pub unreviewed_since: Option<DateTime<Utc>>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Mull schedule store backend.
///
/// Review completion is the one compound write: the state-machine transition
/// and the outcome append must land atomically, so both live behind a single
/// trait method rather than separate read/write calls. Outcomes themselves
/// are append-only; no method mutates or deletes them.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ScheduleStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Schedule lifecycle ────────────────────────────────────────────────

  /// Create and persist the schedule for a freshly created piece of
  /// content: index 0, initial review pending, active, first review due
  /// one day out. Errors if the pair already has a schedule.
  fn create_schedule(
    &self,
    user_id: Uuid,
    content_id: Uuid,
    category: Option<String>,
  ) -> impl Future<Output = Result<Schedule, Self::Error>> + Send + '_;

  /// Retrieve one schedule by its pair. Returns `None` if not found.
  fn get_schedule(
    &self,
    user_id: Uuid,
    content_id: Uuid,
  ) -> impl Future<Output = Result<Option<Schedule>, Self::Error>> + Send + '_;

  /// List all schedules owned by a user, active or not.
  fn list_schedules(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Schedule>, Self::Error>> + Send + '_;

  /// Flip the soft-disable flag; returns the updated schedule.
  fn set_active(
    &self,
    user_id: Uuid,
    content_id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Schedule, Self::Error>> + Send + '_;

  // ── Due selection ─────────────────────────────────────────────────────

  /// All active schedules that are due per `query`: past (or at) their
  /// next review date, or never initially reviewed at all. Ordered by
  /// `next_review_date` ascending for stable pagination.
  fn due_schedules<'a>(
    &'a self,
    user_id: Uuid,
    query: &'a DueQuery,
  ) -> impl Future<Output = Result<Vec<Schedule>, Self::Error>> + Send + 'a;

  // ── Review completion ─────────────────────────────────────────────────

  /// Record a completed review: append the outcome and advance/hold/reset
  /// the schedule in one atomic update, so a half-applied transition is
  /// never observable. The `review_date` is set by the store.
  fn complete_review<'a>(
    &'a self,
    user_id: Uuid,
    review: NewReview,
    policy: &'a IntervalPolicy,
  ) -> impl Future<Output = Result<(Schedule, ReviewOutcome), Self::Error>> + Send + 'a;

  /// Review history for a user, optionally narrowed to one content item,
  /// newest first.
  fn outcomes(
    &self,
    user_id: Uuid,
    content_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ReviewOutcome>, Self::Error>> + Send + '_;

  // ── Tier reconciliation ───────────────────────────────────────────────

  /// Re-clamp every active schedule of `user_id` against `policy`,
  /// persisting only rows that actually changed. Returns the number of
  /// rows written; idempotent, so safe to re-run after a partial failure.
  fn reconcile_tier<'a>(
    &'a self,
    user_id: Uuid,
    policy: &'a IntervalPolicy,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}
