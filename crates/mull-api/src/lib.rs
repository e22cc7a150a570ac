//! JSON REST API for the Mull review scheduler.
//!
//! Exposes an axum [`Router`] backed by any [`mull_core::store::ScheduleStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility; the
//! user id in each path is expected to come from an authenticated context
//! upstream.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mull_api::api_router(state.clone()))
//! ```

pub mod error;
pub mod events;
pub mod reviews;
pub mod schedules;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use mull_core::{
  policy::{PolicySet, TierChange, TierProvider},
  store::ScheduleStore,
};
use tokio::sync::mpsc;

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct ApiState<S, T> {
  pub store:       Arc<S>,
  pub tiers:       Arc<T>,
  pub policies:    Arc<PolicySet>,
  /// Feeds the asynchronous tier-change reconciler.
  pub tier_events: mpsc::Sender<TierChange>,
}

// Manual impl: `Arc` clones regardless of whether S and T do.
impl<S, T> Clone for ApiState<S, T> {
  fn clone(&self) -> Self {
    Self {
      store:       self.store.clone(),
      tiers:       self.tiers.clone(),
      policies:    self.policies.clone(),
      tier_events: self.tier_events.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, T>(state: ApiState<S, T>) -> Router<()>
where
  S: ScheduleStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  T: TierProvider + 'static,
{
  Router::new()
    // Schedules
    .route("/schedules", post(schedules::create::<S, T>))
    .route("/users/{user}/schedules", get(schedules::list::<S, T>))
    .route(
      "/users/{user}/schedules/{content}/active",
      patch(schedules::set_active::<S, T>),
    )
    // Reviews
    .route("/users/{user}/reviews/today", get(reviews::today::<S, T>))
    .route("/users/{user}/reviews/complete", post(reviews::complete::<S, T>))
    .route("/users/{user}/reviews/history", get(reviews::history::<S, T>))
    // Collaborator events
    .route("/events/tier-change", post(events::tier_change::<S, T>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
