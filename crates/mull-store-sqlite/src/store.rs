//! [`SqliteStore`] — the SQLite implementation of [`ScheduleStore`].

use std::path::Path;

use chrono::{Duration, Utc};
use mull_core::{
  policy::IntervalPolicy,
  review::{NewReview, ReviewOutcome},
  schedule::Schedule,
  store::{DueQuery, ScheduleStore},
};
use rusqlite::OptionalExtension as _;
use rusqlite::types::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawOutcome, RawSchedule, encode_dt, encode_result, encode_uuid},
  schema::SCHEMA,
};

const SCHEDULE_COLUMNS: &str = "user_id, content_id, interval_index, next_review_date, \
   initial_review_completed, is_active, category, created_at";

/// Carry a store-level error out of a `conn.call` closure.
fn carry(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

fn read_schedule_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSchedule> {
  Ok(RawSchedule {
    user_id:                  row.get(0)?,
    content_id:               row.get(1)?,
    interval_index:           row.get(2)?,
    next_review_date:         row.get(3)?,
    initial_review_completed: row.get(4)?,
    is_active:                row.get(5)?,
    category:                 row.get(6)?,
    created_at:               row.get(7)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mull schedule store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// run serially on the connection's thread, so a compound write inside one
/// `call` closure is atomic with respect to every other store operation.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ScheduleStore impl ──────────────────────────────────────────────────────

impl ScheduleStore for SqliteStore {
  type Error = Error;

  // ── Schedule lifecycle ────────────────────────────────────────────────────

  async fn create_schedule(
    &self,
    user_id: Uuid,
    content_id: Uuid,
    category: Option<String>,
  ) -> Result<Schedule> {
    let now = Utc::now();
    let schedule = Schedule {
      user_id,
      content_id,
      interval_index: 0,
      next_review_date: now + Duration::days(1),
      initial_review_completed: false,
      is_active: true,
      category,
      created_at: now,
    };

    let user_str    = encode_uuid(user_id);
    let content_str = encode_uuid(content_id);
    let next_str    = encode_dt(schedule.next_review_date);
    let created_str = encode_dt(schedule.created_at);
    let category    = schedule.category.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO schedules (
             user_id, content_id, interval_index, next_review_date,
             initial_review_completed, is_active, category, created_at
           ) VALUES (?1, ?2, 0, ?3, 0, 1, ?4, ?5)",
          rusqlite::params![user_str, content_str, next_str, category, created_str],
        )?;
        Ok(())
      })
      .await;

    match inserted {
      Ok(()) => Ok(schedule),
      Err(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)))
        if e.code == rusqlite::ErrorCode::ConstraintViolation =>
      {
        Err(Error::ScheduleExists(content_id))
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn get_schedule(
    &self,
    user_id: Uuid,
    content_id: Uuid,
  ) -> Result<Option<Schedule>> {
    let user_str    = encode_uuid(user_id);
    let content_str = encode_uuid(content_id);

    let raw: Option<RawSchedule> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SCHEDULE_COLUMNS} FROM schedules
                 WHERE user_id = ?1 AND content_id = ?2"
              ),
              rusqlite::params![user_str, content_str],
              read_schedule_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSchedule::into_schedule).transpose()
  }

  async fn list_schedules(&self, user_id: Uuid) -> Result<Vec<Schedule>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawSchedule> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SCHEDULE_COLUMNS} FROM schedules
           WHERE user_id = ?1
           ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], read_schedule_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchedule::into_schedule).collect()
  }

  async fn set_active(
    &self,
    user_id: Uuid,
    content_id: Uuid,
    active: bool,
  ) -> Result<Schedule> {
    let user_str    = encode_uuid(user_id);
    let content_str = encode_uuid(content_id);

    let raw: Option<RawSchedule> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE schedules SET is_active = ?3
           WHERE user_id = ?1 AND content_id = ?2",
          rusqlite::params![user_str, content_str, active],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SCHEDULE_COLUMNS} FROM schedules
                 WHERE user_id = ?1 AND content_id = ?2"
              ),
              rusqlite::params![user_str, content_str],
              read_schedule_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or(Error::ScheduleNotFound(content_id))?
      .into_schedule()
  }

  // ── Due selection ─────────────────────────────────────────────────────────

  async fn due_schedules(&self, user_id: Uuid, query: &DueQuery) -> Result<Vec<Schedule>> {
    let user_str  = encode_uuid(user_id);
    let as_of_str = encode_dt(query.as_of.unwrap_or_else(Utc::now));
    let category  = query.category.clone();
    let since_str = query.unreviewed_since.map(encode_dt);

    let raws: Vec<RawSchedule> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; placeholders are numbered after
        // the values pushed so far.
        let mut conds: Vec<String> = vec![
          "s.user_id = ?1".into(),
          "s.is_active = 1".into(),
          "(s.next_review_date <= ?2 OR s.initial_review_completed = 0)".into(),
        ];
        let mut values: Vec<Value> =
          vec![Value::Text(user_str), Value::Text(as_of_str)];

        if let Some(cat) = category {
          conds.push(format!("s.category = ?{}", values.len() + 1));
          values.push(Value::Text(cat));
        }
        if let Some(since) = since_str {
          conds.push(format!(
            "NOT EXISTS (
               SELECT 1 FROM review_outcomes o
               WHERE o.user_id = s.user_id
                 AND o.content_id = s.content_id
                 AND o.review_date >= ?{})",
            values.len() + 1
          ));
          values.push(Value::Text(since));
        }

        let sql = format!(
          "SELECT {SCHEDULE_COLUMNS} FROM schedules s
           WHERE {}
           ORDER BY s.next_review_date ASC",
          conds.join(" AND ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(values), read_schedule_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchedule::into_schedule).collect()
  }

  // ── Review completion ─────────────────────────────────────────────────────

  async fn complete_review(
    &self,
    user_id: Uuid,
    review: NewReview,
    policy: &IntervalPolicy,
  ) -> Result<(Schedule, ReviewOutcome)> {
    review.validate()?;

    let now = Utc::now();
    let outcome = ReviewOutcome {
      outcome_id:      Uuid::new_v4(),
      user_id,
      content_id:      review.content_id,
      result:          review.result,
      review_date:     now,
      time_spent_secs: review.time_spent_secs,
      notes:           review.notes,
    };

    let user_str    = encode_uuid(user_id);
    let content_str = encode_uuid(review.content_id);
    let outcome_str = encode_uuid(outcome.outcome_id);
    let result      = review.result;
    let result_str  = encode_result(result).to_owned();
    let date_str    = encode_dt(now);
    let time_spent  = outcome.time_spent_secs.map(|v| v as i64);
    let notes       = outcome.notes.clone();
    let policy      = policy.clone();

    // The read, the state-machine transition, the schedule update, and the
    // outcome append land in one transaction: a half-applied transition is
    // never observable and a failed call leaves the row untouched.
    let updated: Option<Schedule> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let raw = tx
          .query_row(
            &format!(
              "SELECT {SCHEDULE_COLUMNS} FROM schedules
               WHERE user_id = ?1 AND content_id = ?2"
            ),
            rusqlite::params![user_str, content_str],
            read_schedule_row,
          )
          .optional()?;
        let Some(raw) = raw else { return Ok(None) };
        let mut schedule = raw.into_schedule().map_err(carry)?;

        schedule.apply(result, &policy, now);

        tx.execute(
          "UPDATE schedules
           SET interval_index = ?3, next_review_date = ?4,
               initial_review_completed = 1
           WHERE user_id = ?1 AND content_id = ?2",
          rusqlite::params![
            user_str,
            content_str,
            schedule.interval_index as i64,
            encode_dt(schedule.next_review_date),
          ],
        )?;
        tx.execute(
          "INSERT INTO review_outcomes (
             outcome_id, user_id, content_id, result, review_date,
             time_spent_secs, notes
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            outcome_str,
            user_str,
            content_str,
            result_str,
            date_str,
            time_spent,
            notes,
          ],
        )?;
        tx.commit()?;

        Ok(Some(schedule))
      })
      .await?;

    let schedule = updated.ok_or(Error::ScheduleNotFound(review.content_id))?;
    Ok((schedule, outcome))
  }

  async fn outcomes(
    &self,
    user_id: Uuid,
    content_id: Option<Uuid>,
  ) -> Result<Vec<ReviewOutcome>> {
    let user_str    = encode_uuid(user_id);
    let content_str = content_id.map(encode_uuid);

    let raws: Vec<RawOutcome> = self
      .conn
      .call(move |conn| {
        let read = |row: &rusqlite::Row<'_>| -> rusqlite::Result<RawOutcome> {
          Ok(RawOutcome {
            outcome_id:      row.get(0)?,
            user_id:         row.get(1)?,
            content_id:      row.get(2)?,
            result:          row.get(3)?,
            review_date:     row.get(4)?,
            time_spent_secs: row.get(5)?,
            notes:           row.get(6)?,
          })
        };

        let rows = if let Some(content) = content_str {
          let mut stmt = conn.prepare(
            "SELECT outcome_id, user_id, content_id, result, review_date,
                    time_spent_secs, notes
             FROM review_outcomes
             WHERE user_id = ?1 AND content_id = ?2
             ORDER BY review_date DESC",
          )?;
          stmt
            .query_map(rusqlite::params![user_str, content], read)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT outcome_id, user_id, content_id, result, review_date,
                    time_spent_secs, notes
             FROM review_outcomes
             WHERE user_id = ?1
             ORDER BY review_date DESC",
          )?;
          stmt
            .query_map(rusqlite::params![user_str], read)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOutcome::into_outcome).collect()
  }

  // ── Tier reconciliation ───────────────────────────────────────────────────

  async fn reconcile_tier(&self, user_id: Uuid, policy: &IntervalPolicy) -> Result<usize> {
    let now      = Utc::now();
    let user_str = encode_uuid(user_id);
    let policy   = policy.clone();

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let raws = {
          let mut stmt = tx.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules
             WHERE user_id = ?1 AND is_active = 1"
          ))?;
          stmt
            .query_map(rusqlite::params![user_str], read_schedule_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut written = 0usize;
        for raw in raws {
          let mut schedule = raw.into_schedule().map_err(carry)?;
          if schedule.reconcile(&policy, now) {
            tx.execute(
              "UPDATE schedules
               SET interval_index = ?3, next_review_date = ?4
               WHERE user_id = ?1 AND content_id = ?2",
              rusqlite::params![
                user_str,
                encode_uuid(schedule.content_id),
                schedule.interval_index as i64,
                encode_dt(schedule.next_review_date),
              ],
            )?;
            written += 1;
          }
        }

        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(changed)
  }
}
