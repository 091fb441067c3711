//! `duotrack` -- headless DuoTrack client.
//!
//! Signs in, keeps the dashboard of the current day in sync with the
//! backend and the partner socket, and logs every notice and dashboard
//! change until Ctrl-C.
//!
//! # Environment variables
//!
//! | Variable            | Required          | Description                          |
//! |---------------------|-------------------|--------------------------------------|
//! | `DUOTRACK_EMAIL`    | without a token   | Login email                          |
//! | `DUOTRACK_PASSWORD` | without a token   | Login password                       |
//! | `DUOTRACK_DATE`     | no                | Day to open, `YYYY-MM-DD`; today     |
//!
//! Connection settings are read by `ClientConfig::from_env`.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duotrack_cli::{auth, report};
use duotrack_core::dates;
use duotrack_client::{Backend, ClientConfig, DuoTrackApi, TokenStore};
use duotrack_sync::session::Session;
use duotrack_sync::{Engine, EngineConfig, Notifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duotrack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        api_url = %config.api_url,
        ws_url = %config.ws_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting duotrack",
    );

    let tokens = match &config.token_path {
        Some(path) => TokenStore::persistent(path.clone())
            .await
            .with_context(|| format!("Failed to open token file {}", path.display()))?,
        None => TokenStore::in_memory(),
    };
    let tokens = Arc::new(tokens);
    let has_token = tokens.is_present().await;

    let backend: Arc<dyn Backend> = Arc::new(
        DuoTrackApi::new(&config, Arc::clone(&tokens)).context("Failed to build HTTP client")?,
    );
    let notices = Notifier::default();
    let cancel = CancellationToken::new();

    let notice_log = tokio::spawn(report::follow_notices(notices.subscribe(), cancel.clone()));

    let session = Session::new(Arc::clone(&backend), notices.clone());
    let user = auth::sign_in(&session, has_token, |key| std::env::var(key).ok()).await?;

    let engine = Engine::start_with(
        EngineConfig::from_client(&config),
        backend,
        notices,
        user,
    );
    let state_log = tokio::spawn(report::follow_state(engine.store().subscribe(), cancel.clone()));

    if let Some(value) = std::env::var("DUOTRACK_DATE").ok().filter(|v| !v.trim().is_empty()) {
        match dates::parse_date(value.trim()) {
            Ok(date) if dates::date_window(dates::today()).contains(&date) => {
                engine.dashboard().select_date(date).await;
            }
            Ok(date) => tracing::warn!(
                date = %dates::format_date(date),
                "DUOTRACK_DATE is outside the date range, showing today",
            ),
            Err(e) => tracing::warn!(error = %e, "Ignoring DUOTRACK_DATE"),
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Received Ctrl-C");

    engine.shutdown().await;
    cancel.cancel();
    let _ = tokio::join!(notice_log, state_log);

    tracing::info!("duotrack stopped");
    Ok(())
}
