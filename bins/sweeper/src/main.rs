//! elib staging sweeper
//!
//! One-shot job that deletes staged files older than `staging.max_age_secs`.
//! Flows that fail to clean up after themselves leave such files behind.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use elib_core::staging::LocalStaging;
use elib_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elib=debug,elib_core=debug,sweeper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let staging = LocalStaging::from_config(&config.staging);
    let max_age = Duration::from_secs(config.staging.max_age_secs);
    info!(
        root = %staging.root().display(),
        max_age_secs = config.staging.max_age_secs,
        "Sweeping staging area"
    );

    let report = staging.sweep(max_age).await?;
    info!(
        removed = report.removed,
        retained = report.retained,
        failed = report.failed,
        "Sweep finished"
    );

    if report.failed > 0 {
        anyhow::bail!("{} stale file(s) could not be removed", report.failed);
    }
    Ok(())
}
