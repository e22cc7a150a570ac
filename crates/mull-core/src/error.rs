//! Error types for `mull-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::review::MAX_TIME_SPENT_SECS;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no schedule for content {0}")]
  ScheduleNotFound(Uuid),

  #[error("a schedule already exists for content {0}")]
  ScheduleExists(Uuid),

  #[error("time spent {0}s exceeds the {MAX_TIME_SPENT_SECS}s ceiling")]
  TimeSpentTooLong(u32),

  #[error("interval table is empty")]
  EmptyIntervalTable,

  #[error("interval table must start at 1 day (first entry is {0})")]
  TableMustStartAtOne(u32),

  #[error("interval table entries must be strictly ascending")]
  TableNotAscending,

  #[error("max interval days must be positive")]
  ZeroMaxInterval,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
