//! Subscription tiers and the review-interval tables they allow.
//!
//! A tier's policy is a plain value: the ordered table of review intervals
//! (in days) and a scalar ceiling on the effective interval. The ceiling may
//! sit below the table's last entry; indexes whose interval exceeds it are
//! walked back at transition time rather than rejected.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Tier ────────────────────────────────────────────────────────────────────

/// Subscription level; bounds the maximum interval a schedule may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
  Free,
  Basic,
  Premium,
  Pro,
}

// ─── IntervalPolicy ──────────────────────────────────────────────────────────

/// The ordered interval table for one tier plus its day ceiling.
///
/// Invariants, enforced by [`IntervalPolicy::new`]: the table is non-empty,
/// strictly ascending, and starts at 1 day; the ceiling is positive. No
/// `Deserialize` impl on purpose: every policy that enters the system goes
/// through the validating constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalPolicy {
  intervals:         Vec<u32>,
  max_interval_days: u32,
}

impl IntervalPolicy {
  pub fn new(intervals: Vec<u32>, max_interval_days: u32) -> Result<Self> {
    let first = *intervals.first().ok_or(Error::EmptyIntervalTable)?;
    if first != 1 {
      return Err(Error::TableMustStartAtOne(first));
    }
    if intervals.windows(2).any(|w| w[1] <= w[0]) {
      return Err(Error::TableNotAscending);
    }
    if max_interval_days == 0 {
      return Err(Error::ZeroMaxInterval);
    }
    Ok(Self { intervals, max_interval_days })
  }

  pub fn intervals(&self) -> &[u32] { &self.intervals }

  pub fn max_interval_days(&self) -> u32 { self.max_interval_days }

  /// Index of the last table entry.
  pub fn last_index(&self) -> usize { self.intervals.len() - 1 }

  /// Clamp `index` into the table, then walk back to the highest position
  /// whose interval fits under the ceiling. Floors at 0 even if the first
  /// entry itself were above the ceiling.
  pub fn clamp_index(&self, index: usize) -> usize {
    let mut i = index.min(self.last_index());
    while i > 0 && self.intervals[i] > self.max_interval_days {
      i -= 1;
    }
    i
  }

  /// The interval, in days, at a (clamped) index.
  pub fn days_at(&self, index: usize) -> u32 {
    self.intervals[index.min(self.last_index())]
  }
}

// ─── PolicySet ───────────────────────────────────────────────────────────────

/// The injectable `Tier -> IntervalPolicy` mapping.
///
/// Total by construction: every tier has a policy, so no lookup downstream
/// can miss. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySet {
  pub free:    IntervalPolicy,
  pub basic:   IntervalPolicy,
  pub premium: IntervalPolicy,
  pub pro:     IntervalPolicy,
}

/// The shared ladder used by every paid tier; the ceiling differs per tier.
const PAID_TABLE: [u32; 8] = [1, 3, 7, 14, 30, 60, 120, 180];

impl Default for PolicySet {
  fn default() -> Self {
    // Constructed from literals that satisfy the `new` invariants.
    Self {
      free:    IntervalPolicy { intervals: vec![1, 3, 7], max_interval_days: 7 },
      basic:   IntervalPolicy { intervals: PAID_TABLE.to_vec(), max_interval_days: 90 },
      premium: IntervalPolicy { intervals: PAID_TABLE.to_vec(), max_interval_days: 60 },
      pro:     IntervalPolicy { intervals: PAID_TABLE.to_vec(), max_interval_days: 180 },
    }
  }
}

impl PolicySet {
  pub fn policy_for(&self, tier: Tier) -> &IntervalPolicy {
    match tier {
      Tier::Free => &self.free,
      Tier::Basic => &self.basic,
      Tier::Premium => &self.premium,
      Tier::Pro => &self.pro,
    }
  }
}

// ─── Subscription service seam ───────────────────────────────────────────────

/// Access to the subscription service's view of a user's current tier.
///
/// Infallible by contract: a degraded or unknown subscription must map to
/// some tier (implementations typically fall back to [`Tier::Free`]) so
/// policy lookups stay total.
pub trait TierProvider: Send + Sync {
  fn current_tier(&self, user_id: Uuid) -> impl Future<Output = Tier> + Send + '_;
}

/// Answers the same tier for every user. Default wiring and test double.
#[derive(Debug, Clone, Copy)]
pub struct FixedTierProvider(pub Tier);

impl TierProvider for FixedTierProvider {
  async fn current_tier(&self, _user_id: Uuid) -> Tier { self.0 }
}

/// Event emitted by the billing collaborator when a subscription's tier
/// changes; consumed asynchronously by the reconciler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierChange {
  pub user_id: Uuid,
  pub tier:    Tier,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_tables_are_ascending_and_start_at_one() {
    let set = PolicySet::default();
    for tier in [Tier::Free, Tier::Basic, Tier::Premium, Tier::Pro] {
      let policy = set.policy_for(tier);
      let table = policy.intervals();
      assert!(!table.is_empty());
      assert_eq!(table[0], 1);
      assert!(table.windows(2).all(|w| w[0] < w[1]));
      assert!(policy.max_interval_days() >= 1);
    }
  }

  #[test]
  fn new_rejects_malformed_tables() {
    assert!(matches!(
      IntervalPolicy::new(vec![], 7),
      Err(Error::EmptyIntervalTable)
    ));
    assert!(matches!(
      IntervalPolicy::new(vec![2, 3], 7),
      Err(Error::TableMustStartAtOne(2))
    ));
    assert!(matches!(
      IntervalPolicy::new(vec![1, 3, 3], 7),
      Err(Error::TableNotAscending)
    ));
    assert!(matches!(
      IntervalPolicy::new(vec![1, 3, 7], 0),
      Err(Error::ZeroMaxInterval)
    ));
  }

  #[test]
  fn clamp_walks_back_to_highest_entry_under_ceiling() {
    // BASIC: same ladder as PRO but capped at 90 days. The largest entry
    // at or under 90 is 60, at index 5.
    let basic = PolicySet::default().basic;
    assert_eq!(basic.clamp_index(7), 5);
    assert_eq!(basic.days_at(basic.clamp_index(7)), 60);
  }

  #[test]
  fn clamp_is_identity_under_the_ceiling() {
    let pro = PolicySet::default().pro;
    assert_eq!(pro.clamp_index(7), 7);
    assert_eq!(pro.clamp_index(0), 0);
  }

  #[test]
  fn clamp_floors_out_of_range_indexes() {
    let free = PolicySet::default().free;
    assert_eq!(free.clamp_index(99), free.last_index());
  }
}
