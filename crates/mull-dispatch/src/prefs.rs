//! The notification-preference seam.
//!
//! Preferences (enabled flags and configured hours) are owned by the
//! surrounding platform; the dispatcher only ever asks one question: which
//! users want notification kind K at hour H.

use std::{convert::Infallible, future::Future};

use serde::Deserialize;
use uuid::Uuid;

use crate::job::NotificationKind;

/// Read access to per-user notification preferences.
pub trait PreferenceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Users with `kind` enabled whose configured hour equals `hour` (UTC).
  fn users_for(
    &self,
    kind: NotificationKind,
    hour: u32,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;
}

/// One enabled (user, kind, hour) preference row.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PrefEntry {
  pub user_id: Uuid,
  pub kind:    NotificationKind,
  pub hour:    u32,
}

/// An in-process preference table, loaded from configuration. Stands in for
/// the platform's preference service; also the test double.
#[derive(Debug, Clone, Default)]
pub struct StaticPrefs {
  entries: Vec<PrefEntry>,
}

impl StaticPrefs {
  pub fn new(entries: Vec<PrefEntry>) -> Self { Self { entries } }
}

impl PreferenceStore for StaticPrefs {
  type Error = Infallible;

  async fn users_for(&self, kind: NotificationKind, hour: u32) -> Result<Vec<Uuid>, Infallible> {
    Ok(
      self
        .entries
        .iter()
        .filter(|e| e.kind == kind && e.hour == hour)
        .map(|e| e.user_id)
        .collect(),
    )
  }
}
