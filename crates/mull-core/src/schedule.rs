//! The per-(user, content) schedule record and its state machine.
//!
//! A schedule is a single integer cursor into the tier's interval table plus
//! two booleans. Review outcomes drive three transitions: advance (the
//! interval grows), hold (it stays), reset (back to the first entry). All
//! waiting is expressed as a future `next_review_date`, never a blocked
//! thread.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{policy::IntervalPolicy, review::ReviewResult};

// ─── Schedule ────────────────────────────────────────────────────────────────

/// Spaced-repetition state for one (user, content) pair. Unique on the pair;
/// mutated only by [`Schedule::apply`] and [`Schedule::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
  pub user_id:                  Uuid,
  pub content_id:               Uuid,
  /// Cursor into the tier's interval table; always within bounds.
  pub interval_index:           usize,
  pub next_review_date:         DateTime<Utc>,
  /// False until the first-ever review is recorded; while false the
  /// schedule is due unconditionally, whatever `next_review_date` says.
  pub initial_review_completed: bool,
  /// Soft-disable; inactive schedules are excluded from due-selection and
  /// notification bucketing.
  pub is_active:                bool,
  /// Category of the owning content, denormalised at creation time so the
  /// due-selector can filter without a content join.
  pub category:                 Option<String>,
  pub created_at:               DateTime<Utc>,
}

impl Schedule {
  /// Whether this schedule should surface for review at `as_of`.
  pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
    self.is_active
      && (!self.initial_review_completed || self.next_review_date <= as_of)
  }

  /// Apply one review outcome.
  ///
  /// - `Remembered` advances the cursor (saturating at the last entry),
  /// - `Partial` holds it,
  /// - `Forgot` resets it to 0.
  ///
  /// The resulting index is clamped under the tier ceiling in every case,
  /// and the next review date is rebased off `now`, so due dates never move
  /// backward. Every transition marks the initial review as completed.
  pub fn apply(
    &mut self,
    result: ReviewResult,
    policy: &IntervalPolicy,
    now: DateTime<Utc>,
  ) {
    let target = match result {
      ReviewResult::Remembered => self.interval_index.saturating_add(1),
      ReviewResult::Partial => self.interval_index,
      ReviewResult::Forgot => 0,
    };

    let index = policy.clamp_index(target);
    self.interval_index = index;
    self.next_review_date = now + Duration::days(policy.days_at(index) as i64);
    self.initial_review_completed = true;
  }

  /// Re-clamp this schedule against a new tier policy.
  ///
  /// Returns `true` if anything changed. Running it again with the same
  /// policy is a no-op, so reconciliation is idempotent and safe to re-run.
  pub fn reconcile(&mut self, policy: &IntervalPolicy, now: DateTime<Utc>) -> bool {
    let index = policy.clamp_index(self.interval_index);
    if index == self.interval_index {
      return false;
    }

    self.interval_index = index;

    // An already-due review is never delayed. A future date is recomputed,
    // kept at its elapsed-time position relative to creation when that
    // position is still ahead of now.
    if self.next_review_date > now {
      let days = Duration::days(policy.days_at(index) as i64);
      let from_creation = self.created_at + days;
      self.next_review_date = if from_creation > now { from_creation } else { now + days };
    }

    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::policy::PolicySet;

  fn schedule_at(index: usize, now: DateTime<Utc>) -> Schedule {
    Schedule {
      user_id:                  Uuid::new_v4(),
      content_id:               Uuid::new_v4(),
      interval_index:           index,
      next_review_date:         now,
      initial_review_completed: true,
      is_active:                true,
      category:                 None,
      created_at:               now - Duration::days(30),
    }
  }

  fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-02T09:00:00Z")
      .unwrap()
      .with_timezone(&Utc)
  }

  // ── Transitions ──────────────────────────────────────────────────────────

  #[test]
  fn remembered_advances_one_step() {
    let policies = PolicySet::default();
    let pro = &policies.pro;
    let mut s = schedule_at(2, now());

    s.apply(ReviewResult::Remembered, pro, now());

    assert_eq!(s.interval_index, 3);
    assert_eq!(s.next_review_date, now() + Duration::days(14));
    assert!(s.initial_review_completed);
  }

  #[test]
  fn remembered_saturates_at_end_of_table() {
    // FREE: [1, 3, 7], max 7. At the top of the table, remembered holds
    // the last index and reschedules 7 days out.
    let policies = PolicySet::default();
    let free = &policies.free;
    let mut s = schedule_at(2, now());

    s.apply(ReviewResult::Remembered, free, now());

    assert_eq!(s.interval_index, 2);
    assert_eq!(s.next_review_date, now() + Duration::days(7));
  }

  #[test]
  fn remembered_clamps_under_tier_ceiling() {
    // PREMIUM caps at 60 days: advancing from 120 (index 6) walks back to
    // the 60-day entry rather than landing on 180.
    let policies = PolicySet::default();
    let premium = &policies.premium;
    let mut s = schedule_at(6, now());

    s.apply(ReviewResult::Remembered, premium, now());

    assert_eq!(s.interval_index, 5);
    assert_eq!(s.next_review_date, now() + Duration::days(60));
  }

  #[test]
  fn partial_holds_the_index() {
    let policies = PolicySet::default();
    let pro = &policies.pro;
    let mut s = schedule_at(4, now());

    s.apply(ReviewResult::Partial, pro, now());

    assert_eq!(s.interval_index, 4);
    assert_eq!(s.next_review_date, now() + Duration::days(30));
  }

  #[test]
  fn forgot_resets_to_tomorrow() {
    let policies = PolicySet::default();
    let pro = &policies.pro;
    let mut s = schedule_at(3, now());

    s.apply(ReviewResult::Forgot, pro, now());

    assert_eq!(s.interval_index, 0);
    assert_eq!(s.next_review_date, now() + Duration::days(1));
  }

  #[test]
  fn first_transition_completes_the_initial_review() {
    let policies = PolicySet::default();
    let mut s = schedule_at(0, now());
    s.initial_review_completed = false;

    s.apply(ReviewResult::Partial, &policies.free, now());

    assert!(s.initial_review_completed);
  }

  #[test]
  fn remembered_sequence_never_decreases_the_index() {
    let policies = PolicySet::default();
    let pro = &policies.pro;
    let mut s = schedule_at(0, now());

    let mut previous = s.interval_index;
    for _ in 0..12 {
      s.apply(ReviewResult::Remembered, pro, now());
      assert!(s.interval_index >= previous);
      previous = s.interval_index;
    }
    assert_eq!(s.interval_index, pro.last_index());
  }

  #[test]
  fn index_stays_in_bounds_and_under_ceiling_after_any_transition() {
    let policies = PolicySet::default();
    for tier_policy in [&policies.free, &policies.basic, &policies.premium, &policies.pro] {
      for result in [ReviewResult::Remembered, ReviewResult::Partial, ReviewResult::Forgot] {
        for start in 0..=tier_policy.last_index() {
          let mut s = schedule_at(start, now());
          s.apply(result, tier_policy, now());
          assert!(s.interval_index <= tier_policy.last_index());
          assert!(
            tier_policy.days_at(s.interval_index) <= tier_policy.max_interval_days()
          );
        }
      }
    }
  }

  // ── Due predicate ────────────────────────────────────────────────────────

  #[test]
  fn never_reviewed_schedule_is_due_despite_future_date() {
    let mut s = schedule_at(0, now());
    s.initial_review_completed = false;
    s.next_review_date = now() + Duration::days(365);

    assert!(s.is_due(now()));
  }

  #[test]
  fn inactive_schedule_is_never_due() {
    let mut s = schedule_at(0, now());
    s.is_active = false;
    s.next_review_date = now() - Duration::days(10);

    assert!(!s.is_due(now()));
  }

  #[test]
  fn reviewed_schedule_is_due_only_at_or_after_its_date() {
    let mut s = schedule_at(1, now());
    s.next_review_date = now() + Duration::days(3);

    assert!(!s.is_due(now()));
    assert!(s.is_due(now() + Duration::days(3)));
  }

  // ── Reconciliation ───────────────────────────────────────────────────────

  #[test]
  fn downgrade_moves_to_largest_entry_under_new_ceiling() {
    // PRO at index 7 (180 days) downgraded to BASIC (max 90): the largest
    // table entry at or under 90 is 60, at index 5.
    let policies = PolicySet::default();
    let mut s = schedule_at(7, now());
    s.next_review_date = now() + Duration::days(120);

    let changed = s.reconcile(&policies.basic, now());

    assert!(changed);
    assert_eq!(s.interval_index, 5);
  }

  #[test]
  fn reconcile_is_idempotent() {
    let policies = PolicySet::default();
    let mut s = schedule_at(7, now());
    s.next_review_date = now() + Duration::days(120);

    assert!(s.reconcile(&policies.basic, now()));
    let settled = s.clone();
    assert!(!s.reconcile(&policies.basic, now()));
    assert_eq!(s, settled);
  }

  #[test]
  fn reconcile_never_delays_an_already_due_review() {
    let policies = PolicySet::default();
    let mut s = schedule_at(7, now());
    let overdue = now() - Duration::days(2);
    s.next_review_date = overdue;

    s.reconcile(&policies.basic, now());

    assert_eq!(s.next_review_date, overdue);
  }

  #[test]
  fn reconcile_keeps_future_dates_at_their_elapsed_position() {
    // Created 30 days ago, new interval 60 days: the elapsed-time position
    // (created_at + 60d = now + 30d) is still ahead of now, so it wins.
    let policies = PolicySet::default();
    let mut s = schedule_at(7, now());
    s.next_review_date = now() + Duration::days(150);

    s.reconcile(&policies.basic, now());

    assert_eq!(s.next_review_date, s.created_at + Duration::days(60));
  }

  #[test]
  fn reconcile_rebases_off_now_when_elapsed_position_has_passed() {
    let policies = PolicySet::default();
    let mut s = schedule_at(7, now());
    s.created_at = now() - Duration::days(400);
    s.next_review_date = now() + Duration::days(150);

    s.reconcile(&policies.basic, now());

    assert_eq!(s.next_review_date, now() + Duration::days(60));
  }

  #[test]
  fn reconcile_clamps_out_of_range_index_into_new_table() {
    // A table shorter than the stored index (paid ladder -> FREE).
    let policies = PolicySet::default();
    let mut s = schedule_at(6, now());
    s.next_review_date = now() - Duration::days(1);

    let changed = s.reconcile(&policies.free, now());

    assert!(changed);
    assert_eq!(s.interval_index, policies.free.last_index());
  }
}
