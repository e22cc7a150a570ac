//! mull-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, mounts the JSON API under `/api`, and spawns the
//! hourly notification dispatcher and the tier-change reconciler alongside
//! the HTTP server.

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use mull_api::{ApiState, api_router};
use mull_core::policy::{FixedTierProvider, Tier};
use mull_dispatch::{Dispatcher, LogSink, Reconciler, StaticPrefs, run_hourly, run_reconciler};
use mull_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::mpsc};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Mull review scheduler server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MULL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let policies = Arc::new(server_cfg.policy_set()?);
  let summary_weekday = server_cfg.summary_weekday()?;

  // Expand `~` in store path and open the SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  // Until a real subscription service is connected, every user is on the
  // configured default tier.
  let tiers = Arc::new(FixedTierProvider(
    server_cfg.default_tier.unwrap_or(Tier::Free),
  ));

  // Tier-change reconciler, fed by the /events/tier-change webhook.
  let (tier_tx, tier_rx) = mpsc::channel(64);
  let reconciler = Arc::new(Reconciler::new(store.clone(), policies.clone()));
  tokio::spawn(run_reconciler(reconciler, tier_rx));

  // Hourly notification dispatcher.
  let prefs = Arc::new(StaticPrefs::new(server_cfg.notifications.clone()));
  let dispatcher = Arc::new(Dispatcher::new(
    store.clone(),
    prefs,
    Arc::new(LogSink),
    summary_weekday,
  ));
  tokio::spawn(run_hourly(dispatcher));

  // Build application state and serve.
  let state = ApiState {
    store,
    tiers,
    policies,
    tier_events: tier_tx,
  };
  let app = Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
