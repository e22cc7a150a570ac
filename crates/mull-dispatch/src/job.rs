//! Notification jobs and the task-queue seam.
//!
//! The dispatcher's responsibility ends at enqueueing: delivery is owned by
//! an external task queue with at-least-once semantics, consumed through the
//! [`JobSink`] trait.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ─── Job types ───────────────────────────────────────────────────────────────

/// The three notification buckets, each with its own per-user configured hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
  Daily,
  Evening,
  Weekly,
}

/// One dispatch job: everything the downstream queue worker needs to send a
/// single notification to a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
  pub user_id:     Uuid,
  pub kind:        NotificationKind,
  /// The content half of the (user, content) keys of the due schedules this
  /// notification covers. Empty for a weekly summary with nothing due.
  pub content_ids: Vec<Uuid>,
}

// ─── Sink seam ───────────────────────────────────────────────────────────────

/// A failed enqueue. Treated as transient by contract: the dispatcher
/// retries a bounded number of times, then drops the job with a log line.
#[derive(Debug, Error)]
#[error("enqueue failed: {0}")]
pub struct SinkError(pub String);

/// Fire-and-forget submission into the surrounding application's task queue.
pub trait JobSink: Send + Sync {
  fn enqueue<'a>(
    &'a self,
    job: &'a NotificationJob,
  ) -> impl Future<Output = Result<(), SinkError>> + Send + 'a;
}

/// A sink that only logs. Default wiring for deployments that have not yet
/// connected a real queue; also keeps the dispatcher observable in dev.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl JobSink for LogSink {
  async fn enqueue(&self, job: &NotificationJob) -> Result<(), SinkError> {
    tracing::info!(
      user = %job.user_id,
      kind = ?job.kind,
      due = job.content_ids.len(),
      "notification job (log sink)"
    );
    Ok(())
  }
}
