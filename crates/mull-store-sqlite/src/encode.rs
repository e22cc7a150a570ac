//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Review results are stored as their
//! lowercase discriminant.

use chrono::{DateTime, Utc};
use mull_core::{
  review::{ReviewOutcome, ReviewResult},
  schedule::Schedule,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ReviewResult ────────────────────────────────────────────────────────────

pub fn encode_result(r: ReviewResult) -> &'static str {
  match r {
    ReviewResult::Remembered => "remembered",
    ReviewResult::Partial => "partial",
    ReviewResult::Forgot => "forgot",
  }
}

pub fn decode_result(s: &str) -> Result<ReviewResult> {
  match s {
    "remembered" => Ok(ReviewResult::Remembered),
    "partial" => Ok(ReviewResult::Partial),
    "forgot" => Ok(ReviewResult::Forgot),
    other => Err(Error::DateParse(format!("unknown review result: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `schedules` row.
pub struct RawSchedule {
  pub user_id:                  String,
  pub content_id:               String,
  pub interval_index:           i64,
  pub next_review_date:         String,
  pub initial_review_completed: bool,
  pub is_active:                bool,
  pub category:                 Option<String>,
  pub created_at:               String,
}

impl RawSchedule {
  pub fn into_schedule(self) -> Result<Schedule> {
    Ok(Schedule {
      user_id:                  decode_uuid(&self.user_id)?,
      content_id:               decode_uuid(&self.content_id)?,
      // A negative index is never written; floor defensively on read.
      interval_index:           self.interval_index.max(0) as usize,
      next_review_date:         decode_dt(&self.next_review_date)?,
      initial_review_completed: self.initial_review_completed,
      is_active:                self.is_active,
      category:                 self.category,
      created_at:               decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `review_outcomes` row.
pub struct RawOutcome {
  pub outcome_id:      String,
  pub user_id:         String,
  pub content_id:      String,
  pub result:          String,
  pub review_date:     String,
  pub time_spent_secs: Option<i64>,
  pub notes:           Option<String>,
}

impl RawOutcome {
  pub fn into_outcome(self) -> Result<ReviewOutcome> {
    Ok(ReviewOutcome {
      outcome_id:      decode_uuid(&self.outcome_id)?,
      user_id:         decode_uuid(&self.user_id)?,
      content_id:      decode_uuid(&self.content_id)?,
      result:          decode_result(&self.result)?,
      review_date:     decode_dt(&self.review_date)?,
      time_spent_secs: self.time_spent_secs.map(|v| v.max(0) as u32),
      notes:           self.notes,
    })
  }
}
