//! The hourly notification bucketing dispatcher.
//!
//! Each tick groups due schedules by user for every user whose configured
//! notification hour matches the current hour, and emits one job per user
//! per notification kind. Users are processed independently: one user's
//! failure is logged and skipped, never propagated to the rest of the tick.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Datelike as _, NaiveTime, Timelike as _, Utc, Weekday};
use mull_core::store::{DueQuery, ScheduleStore};

use crate::{
  job::{JobSink, NotificationJob, NotificationKind},
  prefs::PreferenceStore,
};

// ─── Dispatcher ──────────────────────────────────────────────────────────────

pub struct Dispatcher<S, P, Q> {
  store:            Arc<S>,
  prefs:            Arc<P>,
  sink:             Arc<Q>,
  /// Weekday on which the weekly summary bucket is evaluated.
  summary_weekday:  Weekday,
  enqueue_attempts: u32,
  retry_delay:      Duration,
}

impl<S, P, Q> Dispatcher<S, P, Q>
where
  S: ScheduleStore,
  P: PreferenceStore,
  Q: JobSink,
{
  pub fn new(store: Arc<S>, prefs: Arc<P>, sink: Arc<Q>, summary_weekday: Weekday) -> Self {
    Self {
      store,
      prefs,
      sink,
      summary_weekday,
      enqueue_attempts: 3,
      retry_delay: Duration::from_secs(5),
    }
  }

  /// Override the bounded-retry parameters (tests use a tiny delay).
  pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
    self.enqueue_attempts = attempts.max(1);
    self.retry_delay = delay;
    self
  }

  /// Run one hourly tick at `now`.
  ///
  /// Ticks are idempotent over the due predicate; an overrun into the next
  /// hour at worst duplicates a notification, it never loses one.
  pub async fn tick(&self, now: DateTime<Utc>) {
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    // Reminders cover everything that comes due today, not only what is
    // already past due at tick time.
    let end_of_day = midnight + chrono::Duration::days(1);

    self
      .run_bucket(NotificationKind::Daily, now, end_of_day, None, false)
      .await;
    // The evening reminder only nags about pairs not yet reviewed today.
    self
      .run_bucket(NotificationKind::Evening, now, end_of_day, Some(midnight), false)
      .await;
    if now.weekday() == self.summary_weekday {
      // The summary fires for every enabled user, due schedules or not.
      self
        .run_bucket(NotificationKind::Weekly, now, end_of_day, None, true)
        .await;
    }
  }

  async fn run_bucket(
    &self,
    kind: NotificationKind,
    now: DateTime<Utc>,
    as_of: DateTime<Utc>,
    unreviewed_since: Option<DateTime<Utc>>,
    fire_when_empty: bool,
  ) {
    let users = match self.prefs.users_for(kind, now.hour()).await {
      Ok(users) => users,
      Err(e) => {
        tracing::warn!(?kind, error = %e, "preference lookup failed; skipping bucket");
        return;
      }
    };

    for user_id in users {
      let query = DueQuery {
        as_of: Some(as_of),
        category: None,
        unreviewed_since,
      };
      let due = match self.store.due_schedules(user_id, &query).await {
        Ok(due) => due,
        Err(e) => {
          tracing::warn!(user = %user_id, ?kind, error = %e, "due selection failed; skipping user");
          continue;
        }
      };
      if due.is_empty() && !fire_when_empty {
        continue;
      }

      let job = NotificationJob {
        user_id,
        kind,
        content_ids: due.iter().map(|s| s.content_id).collect(),
      };
      self.enqueue_with_retry(&job).await;
    }
  }

  /// Bounded fire-and-forget enqueue: a fixed number of attempts with a
  /// fixed delay, then the job is dropped and logged.
  async fn enqueue_with_retry(&self, job: &NotificationJob) -> bool {
    for attempt in 1..=self.enqueue_attempts {
      match self.sink.enqueue(job).await {
        Ok(()) => return true,
        Err(e) if attempt < self.enqueue_attempts => {
          tracing::warn!(
            user = %job.user_id,
            kind = ?job.kind,
            attempt,
            error = %e,
            "enqueue failed; retrying"
          );
          tokio::time::sleep(self.retry_delay).await;
        }
        Err(e) => {
          tracing::warn!(
            user = %job.user_id,
            kind = ?job.kind,
            error = %e,
            "enqueue failed after final attempt; dropping job"
          );
        }
      }
    }
    false
  }
}

// ─── Background loop ─────────────────────────────────────────────────────────

/// Drive the dispatcher on an hourly tokio interval. Never returns; spawn it.
pub async fn run_hourly<S, P, Q>(dispatcher: Arc<Dispatcher<S, P, Q>>)
where
  S: ScheduleStore,
  P: PreferenceStore,
  Q: JobSink,
{
  tracing::info!("notification dispatcher started (hourly tick)");
  let mut interval = tokio::time::interval(Duration::from_secs(3600));
  loop {
    interval.tick().await;
    dispatcher.tick(Utc::now()).await;
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicU32, Ordering};

  use chrono::{TimeZone as _, Timelike as _};
  use mull_core::{
    policy::PolicySet,
    review::{NewReview, ReviewResult},
  };
  use mull_store_sqlite::SqliteStore;
  use uuid::Uuid;

  use crate::job::SinkError;
  use crate::prefs::{PrefEntry, StaticPrefs};

  /// Records every successfully enqueued job.
  #[derive(Default)]
  struct RecordingSink {
    jobs: Mutex<Vec<NotificationJob>>,
  }

  impl JobSink for RecordingSink {
    async fn enqueue(&self, job: &NotificationJob) -> Result<(), SinkError> {
      self.jobs.lock().unwrap().push(job.clone());
      Ok(())
    }
  }

  /// Fails the first `failures` attempts, then records like `RecordingSink`.
  #[derive(Default)]
  struct FlakySink {
    failures: AtomicU32,
    jobs:     Mutex<Vec<NotificationJob>>,
  }

  impl JobSink for FlakySink {
    async fn enqueue(&self, job: &NotificationJob) -> Result<(), SinkError> {
      if self.failures.load(Ordering::SeqCst) > 0 {
        self.failures.fetch_sub(1, Ordering::SeqCst);
        return Err(SinkError("queue unavailable".into()));
      }
      self.jobs.lock().unwrap().push(job.clone());
      Ok(())
    }
  }

  /// Always fails for one user; records everyone else.
  struct FailFor {
    target: Uuid,
    jobs:   Mutex<Vec<NotificationJob>>,
  }

  impl JobSink for FailFor {
    async fn enqueue(&self, job: &NotificationJob) -> Result<(), SinkError> {
      if job.user_id == self.target {
        return Err(SinkError("queue unavailable".into()));
      }
      self.jobs.lock().unwrap().push(job.clone());
      Ok(())
    }
  }

  /// 2025-06-02 09:00 UTC is a Monday.
  fn monday_nine() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
  }

  fn dispatcher<Q: JobSink>(
    store: Arc<SqliteStore>,
    entries: Vec<PrefEntry>,
    sink: Arc<Q>,
  ) -> Dispatcher<SqliteStore, StaticPrefs, Q> {
    Dispatcher::new(
      store,
      Arc::new(StaticPrefs::new(entries)),
      sink,
      Weekday::Mon,
    )
    .with_retry(3, Duration::from_millis(1))
  }

  #[tokio::test]
  async fn daily_bucket_emits_one_job_per_user_with_due_schedules() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    let content = Uuid::new_v4();
    // A has one never-reviewed (hence due) schedule; B has none.
    store.create_schedule(user_a, content, None).await.unwrap();

    let sink = Arc::new(RecordingSink::default());
    let entries = vec![
      PrefEntry { user_id: user_a, kind: NotificationKind::Daily, hour: 9 },
      PrefEntry { user_id: user_b, kind: NotificationKind::Daily, hour: 9 },
    ];
    dispatcher(store, entries, sink.clone()).tick(monday_nine()).await;

    let jobs = sink.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].user_id, user_a);
    assert_eq!(jobs[0].kind, NotificationKind::Daily);
    assert_eq!(jobs[0].content_ids, vec![content]);
  }

  #[tokio::test]
  async fn users_with_other_hours_are_not_bucketed() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let user = Uuid::new_v4();
    store.create_schedule(user, Uuid::new_v4(), None).await.unwrap();

    let sink = Arc::new(RecordingSink::default());
    let entries =
      vec![PrefEntry { user_id: user, kind: NotificationKind::Daily, hour: 18 }];
    dispatcher(store, entries, sink.clone()).tick(monday_nine()).await;

    assert!(sink.jobs.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn evening_bucket_skips_pairs_already_reviewed_today() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let policies = PolicySet::default();
    let user = Uuid::new_v4();
    let reviewed = Uuid::new_v4();
    let pending = Uuid::new_v4();
    store.create_schedule(user, reviewed, None).await.unwrap();
    store.create_schedule(user, pending, None).await.unwrap();
    store
      .complete_review(user, NewReview::new(reviewed, ReviewResult::Forgot), &policies.free)
      .await
      .unwrap();

    // Tick at the wall clock so the just-recorded outcome counts as
    // today's review; the preference hour is aligned to the tick hour.
    let now = Utc::now();
    let sink = Arc::new(RecordingSink::default());
    let entries = vec![PrefEntry {
      user_id: user,
      kind:    NotificationKind::Evening,
      hour:    now.hour(),
    }];
    dispatcher(store, entries, sink.clone()).tick(now).await;

    let jobs = sink.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, NotificationKind::Evening);
    assert_eq!(jobs[0].content_ids, vec![pending]);
  }

  #[tokio::test]
  async fn weekly_summary_fires_even_with_nothing_due() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let user = Uuid::new_v4();

    let sink = Arc::new(RecordingSink::default());
    let entries =
      vec![PrefEntry { user_id: user, kind: NotificationKind::Weekly, hour: 9 }];
    dispatcher(store, entries, sink.clone()).tick(monday_nine()).await;

    let jobs = sink.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, NotificationKind::Weekly);
    assert!(jobs[0].content_ids.is_empty());
  }

  #[tokio::test]
  async fn weekly_summary_respects_the_configured_weekday() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let user = Uuid::new_v4();

    let sink = Arc::new(RecordingSink::default());
    let entries =
      vec![PrefEntry { user_id: user, kind: NotificationKind::Weekly, hour: 9 }];
    // Summary day is Sunday; a Monday tick must not fire it.
    let d = Dispatcher::new(
      store,
      Arc::new(StaticPrefs::new(entries)),
      sink.clone(),
      Weekday::Sun,
    );
    d.tick(monday_nine()).await;

    assert!(sink.jobs.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn enqueue_retries_through_transient_failures() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let user = Uuid::new_v4();
    store.create_schedule(user, Uuid::new_v4(), None).await.unwrap();

    let sink = Arc::new(FlakySink::default());
    sink.failures.store(2, Ordering::SeqCst);
    let entries =
      vec![PrefEntry { user_id: user, kind: NotificationKind::Daily, hour: 9 }];
    dispatcher(store, entries, sink.clone()).tick(monday_nine()).await;

    // Two failures burned, third attempt landed.
    assert_eq!(sink.jobs.lock().unwrap().len(), 1);
    assert_eq!(sink.failures.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn exhausted_retries_drop_the_job() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let user = Uuid::new_v4();
    store.create_schedule(user, Uuid::new_v4(), None).await.unwrap();

    let sink = Arc::new(FlakySink::default());
    sink.failures.store(10, Ordering::SeqCst);
    let entries =
      vec![PrefEntry { user_id: user, kind: NotificationKind::Daily, hour: 9 }];
    dispatcher(store, entries, sink.clone()).tick(monday_nine()).await;

    assert!(sink.jobs.lock().unwrap().is_empty());
    // Exactly the bounded attempt count was consumed.
    assert_eq!(sink.failures.load(Ordering::SeqCst), 7);
  }

  #[tokio::test]
  async fn one_users_failure_does_not_block_others() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    store.create_schedule(user_a, Uuid::new_v4(), None).await.unwrap();
    store.create_schedule(user_b, Uuid::new_v4(), None).await.unwrap();

    let sink = Arc::new(FailFor { target: user_a, jobs: Mutex::new(Vec::new()) });
    let entries = vec![
      PrefEntry { user_id: user_a, kind: NotificationKind::Daily, hour: 9 },
      PrefEntry { user_id: user_b, kind: NotificationKind::Daily, hour: 9 },
    ];
    dispatcher(store, entries, sink.clone()).tick(monday_nine()).await;

    let jobs = sink.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].user_id, user_b);
  }
}
