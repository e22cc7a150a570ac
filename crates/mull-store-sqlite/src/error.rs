//! Error type for `mull-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] mull_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The (user, content) pair has no schedule row.
  #[error("no schedule for content {0}")]
  ScheduleNotFound(Uuid),

  #[error("a schedule already exists for content {0}")]
  ScheduleExists(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
