//! Asynchronous tier-change reconciliation.
//!
//! Billing emits a [`TierChange`] event when a subscription moves between
//! tiers; it is consumed here, off the billing request path, and every
//! active schedule of the affected user is re-clamped against the new
//! tier's interval policy. The store-side operation is idempotent, so a
//! re-delivered event is harmless.

use std::sync::Arc;

use mull_core::{
  policy::{PolicySet, TierChange},
  store::ScheduleStore,
};
use tokio::sync::mpsc;

// ─── Reconciler ──────────────────────────────────────────────────────────────

pub struct Reconciler<S> {
  store:    Arc<S>,
  policies: Arc<PolicySet>,
}

impl<S: ScheduleStore> Reconciler<S> {
  pub fn new(store: Arc<S>, policies: Arc<PolicySet>) -> Self {
    Self { store, policies }
  }

  /// Apply one tier-change event. Never raises: a failure (including the
  /// user's schedules having vanished in a deletion race) is logged and the
  /// event is dropped. Returns the number of schedules rewritten.
  pub async fn handle(&self, change: TierChange) -> usize {
    let policy = self.policies.policy_for(change.tier);
    match self.store.reconcile_tier(change.user_id, policy).await {
      Ok(changed) => {
        if changed > 0 {
          tracing::info!(
            user = %change.user_id,
            tier = ?change.tier,
            changed,
            "schedules re-clamped after tier change"
          );
        }
        changed
      }
      Err(e) => {
        tracing::warn!(
          user = %change.user_id,
          tier = ?change.tier,
          error = %e,
          "tier reconciliation failed; dropping event"
        );
        0
      }
    }
  }
}

// ─── Background loop ─────────────────────────────────────────────────────────

/// Drain tier-change events until the channel closes. Spawn it next to the
/// dispatcher loop.
pub async fn run_reconciler<S: ScheduleStore>(
  reconciler: Arc<Reconciler<S>>,
  mut events: mpsc::Receiver<TierChange>,
) {
  tracing::info!("tier-change reconciler started");
  while let Some(change) = events.recv().await {
    reconciler.handle(change).await;
  }
  tracing::info!("tier-change channel closed; reconciler exiting");
}

// ─── Tests ───────────────────────────────────────────────────────────────────
