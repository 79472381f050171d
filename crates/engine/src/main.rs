//! tickmud engine - main entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickmud_engine::api::telnet;
use tickmud_engine::infrastructure::settings::EngineSettings;
use tickmud_engine::infrastructure::sqlite::SqliteStore;
use tickmud_engine::App;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may be run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickmud_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting tickmud engine");

    let settings = EngineSettings::from_env().context("invalid engine settings")?;

    tracing::info!(database_url = %settings.database_url, "Opening world database");
    let store = Arc::new(
        SqliteStore::connect(&settings.database_url)
            .await
            .context("failed to open world database")?,
    );
    if settings.seed_demo_world && store.seed_demo_world().await? {
        tracing::info!("Empty database, demo world created");
    }
    let stale = store.reset_online().await?;
    if stale > 0 {
        tracing::info!(players = stale, "Cleared stale online flags");
    }

    let bind_addr = settings.bind_addr;
    let app = Arc::new(App::new(store, settings).await.context("failed to assemble engine")?);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    telnet::serve(listener, app.clone(), shutdown_signal()).await?;

    let told = app.announce_shutdown().await;
    // Give connection writers a moment to flush the announcement.
    tokio::time::sleep(SHUTDOWN_GRACE.min(app.settings.write_timeout)).await;
    tracing::info!(online = told, "Engine stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
