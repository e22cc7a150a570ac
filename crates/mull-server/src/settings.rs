//! Runtime server configuration, deserialised from `config.toml` with
//! `MULL_`-prefixed environment overrides. Every field has a default, so the
//! server also starts with no file at all.

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Weekday;
use mull_core::policy::{IntervalPolicy, PolicySet, Tier};
use mull_dispatch::PrefEntry;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// Weekday for the weekly summary bucket; accepts names like `"mon"` or
  /// `"Monday"`. Defaults to Monday.
  #[serde(default)]
  pub summary_weekday: Option<String>,
  /// Tier answered for every user until a real subscription service is
  /// wired in. Defaults to FREE.
  #[serde(default)]
  pub default_tier:    Option<Tier>,
  /// Enabled notification preference rows, one per (user, kind, hour).
  #[serde(default)]
  pub notifications:   Vec<PrefEntry>,
  /// Per-tier overrides of the built-in interval tables.
  #[serde(default)]
  pub policies:        Option<PolicyOverrides>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyOverrides {
  pub free:    Option<PolicyEntry>,
  pub basic:   Option<PolicyEntry>,
  pub premium: Option<PolicyEntry>,
  pub pro:     Option<PolicyEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyEntry {
  pub intervals:         Vec<u32>,
  pub max_interval_days: u32,
}

impl PolicyEntry {
  fn build(&self) -> mull_core::Result<IntervalPolicy> {
    IntervalPolicy::new(self.intervals.clone(), self.max_interval_days)
  }
}

impl ServerConfig {
  /// The built-in policy set with any configured per-tier overrides applied.
  /// Overrides are validated here, at startup, so a malformed table can
  /// never reach the state machine.
  pub fn policy_set(&self) -> anyhow::Result<PolicySet> {
    let mut set = PolicySet::default();
    if let Some(overrides) = &self.policies {
      if let Some(entry) = &overrides.free {
        set.free = entry.build().context("invalid [policies.free]")?;
      }
      if let Some(entry) = &overrides.basic {
        set.basic = entry.build().context("invalid [policies.basic]")?;
      }
      if let Some(entry) = &overrides.premium {
        set.premium = entry.build().context("invalid [policies.premium]")?;
      }
      if let Some(entry) = &overrides.pro {
        set.pro = entry.build().context("invalid [policies.pro]")?;
      }
    }
    Ok(set)
  }

  pub fn summary_weekday(&self) -> anyhow::Result<Weekday> {
    match &self.summary_weekday {
      None => Ok(Weekday::Mon),
      Some(s) => s
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid summary_weekday: {s:?}")),
    }
  }
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 5380 }

fn default_store_path() -> PathBuf { PathBuf::from("mull.db") }

#[cfg(test)]
mod tests {
  use super::*;

  fn minimal() -> ServerConfig {
    ServerConfig {
      host:            default_host(),
      port:            default_port(),
      store_path:      default_store_path(),
      summary_weekday: None,
      default_tier:    None,
      notifications:   Vec::new(),
      policies:        None,
    }
  }

  #[test]
  fn weekday_parses_names_and_defaults_to_monday() {
    let mut cfg = minimal();
    assert_eq!(cfg.summary_weekday().unwrap(), Weekday::Mon);

    cfg.summary_weekday = Some("sunday".into());
    assert_eq!(cfg.summary_weekday().unwrap(), Weekday::Sun);

    cfg.summary_weekday = Some("someday".into());
    assert!(cfg.summary_weekday().is_err());
  }

  #[test]
  fn policy_overrides_replace_only_the_named_tier() {
    let mut cfg = minimal();
    cfg.policies = Some(PolicyOverrides {
      premium: Some(PolicyEntry {
        intervals:         vec![1, 3, 7, 14, 30, 60, 120, 180],
        max_interval_days: 90,
      }),
      ..Default::default()
    });

    let set = cfg.policy_set().unwrap();
    assert_eq!(set.premium.max_interval_days(), 90);
    assert_eq!(set.basic, PolicySet::default().basic);
  }

  #[test]
  fn malformed_policy_override_fails_at_startup() {
    let mut cfg = minimal();
    cfg.policies = Some(PolicyOverrides {
      free: Some(PolicyEntry { intervals: vec![3, 1], max_interval_days: 7 }),
      ..Default::default()
    });
    assert!(cfg.policy_set().is_err());
  }
}
