//! Review outcome types — the append-only history of completed reviews.
//!
//! An outcome is recorded once per completed review and never mutated. It is
//! an audit trail and analytics input only: the state machine acts on the
//! outcome just submitted, it does not re-read history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Ceiling on the recorded `time_spent_secs` of a single review (24 hours).
pub const MAX_TIME_SPENT_SECS: u32 = 86_400;

// ─── ReviewResult ────────────────────────────────────────────────────────────

/// How the review went, as submitted by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewResult {
  Remembered,
  Partial,
  Forgot,
}

// ─── ReviewOutcome ───────────────────────────────────────────────────────────

/// An immutable record of one completed review. Once written, no field is
/// ever updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
  pub outcome_id:      Uuid,
  pub user_id:         Uuid,
  pub content_id:      Uuid,
  pub result:          ReviewResult,
  /// Store-assigned timestamp; never changes after creation.
  pub review_date:     DateTime<Utc>,
  pub time_spent_secs: Option<u32>,
  pub notes:           Option<String>,
}

// ─── NewReview ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::ScheduleStore::complete_review`].
/// `review_date` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewReview {
  pub content_id:      Uuid,
  pub result:          ReviewResult,
  pub time_spent_secs: Option<u32>,
  pub notes:           Option<String>,
}

impl NewReview {
  /// Convenience constructor with the optional fields unset.
  pub fn new(content_id: Uuid, result: ReviewResult) -> Self {
    Self { content_id, result, time_spent_secs: None, notes: None }
  }

  /// Reject before any mutation; a failed review submission must leave the
  /// schedule untouched.
  pub fn validate(&self) -> Result<()> {
    if let Some(secs) = self.time_spent_secs
      && secs > MAX_TIME_SPENT_SECS
    {
      return Err(Error::TimeSpentTooLong(secs));
    }
    Ok(())
  }
}
