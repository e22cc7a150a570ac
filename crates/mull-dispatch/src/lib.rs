//! Background work for the Mull scheduler: the hourly notification
//! bucketing dispatcher and the asynchronous tier-change reconciler.
//!
//! Neither owns a thread pool. Each dispatcher tick and each tier-change
//! event is an independent unit of work; all scheduling state lives in the
//! persisted schedule rows, and all waiting is a future `next_review_date`.

#![allow(async_fn_in_trait)]

pub mod dispatcher;
pub mod job;
pub mod prefs;
pub mod reconcile;

pub use dispatcher::{Dispatcher, run_hourly};
pub use job::{JobSink, LogSink, NotificationJob, NotificationKind, SinkError};
pub use prefs::{PrefEntry, PreferenceStore, StaticPrefs};
pub use reconcile::{Reconciler, run_reconciler};
