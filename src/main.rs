use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use gguf_sync::completeness::CompletenessVerifier;
use gguf_sync::config::Config;
use gguf_sync::discovery::DiscoveryEngine;
use gguf_sync::enrich::Enricher;
use gguf_sync::fetcher::Fetcher;
use gguf_sync::hub::HttpHubClient;
use gguf_sync::orchestrator::Orchestrator;
use gguf_sync::recovery::alerts::{AlertDispatcher, LogAlertChannel};
use gguf_sync::recovery::rollback::RollbackManager;
use gguf_sync::recovery::RecoveryLayer;
use gguf_sync::validate::AccessibilityCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Load .env file if present (silently ignored if missing)
    dotenvy::dotenv().ok();

    tracing::info!("gguf-sync starting");

    let mut config = Config::from_env();
    if let Ok(path) = std::env::var("GGUF_SYNC_CONFIG_FILE") {
        config = config.load(Path::new(&path))?;
    }

    let data_dir = Path::new(&config.data_dir);
    tokio::fs::create_dir_all(data_dir).await.ok();
    tokio::fs::create_dir_all(data_dir.join("retention")).await.ok();
    tokio::fs::create_dir_all(data_dir.join("backups")).await.ok();
    tokio::fs::create_dir_all("reports").await.ok();

    let hub = Arc::new(HttpHubClient::new(
        config.hub_base_url.clone(),
        config.hub_token.clone(),
        Duration::from_secs(config.timeout_seconds),
    ));
    let fetcher = Arc::new(Fetcher::new(config.max_concurrency, config.hourly_limit()));

    let discovery = DiscoveryEngine::new(hub.clone(), fetcher.clone());
    let enricher = Enricher::new(hub.clone(), fetcher.clone());
    let completeness = CompletenessVerifier::new(
        hub.clone(),
        fetcher.clone(),
        config.warning_threshold,
        config.excellent_threshold,
    );
    let accessibility = Arc::new(AccessibilityCache::new(reqwest::Client::new()));

    let rollback = RollbackManager::new(data_dir.join("backups"));
    let alerts = AlertDispatcher::new(vec![Box::new(LogAlertChannel)]);
    let recovery = RecoveryLayer::new(rollback, alerts);

    let cancel = CancellationToken::new();
    let watchdog = {
        let cancel = cancel.clone();
        let budget = Duration::from_secs_f64(config.wall_clock_budget_hours * 3600.0);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(budget) => {
                    tracing::warn!("wall-clock budget exceeded, cancelling run");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        })
    };
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("received interrupt, cancelling run");
                cancel.cancel();
            }
        })
    };

    let orchestrator = Orchestrator::new(hub, fetcher, discovery, enricher, completeness, accessibility, recovery, config);

    let report = orchestrator.run(&cancel).await;
    cancel.cancel();
    watchdog.abort();
    ctrl_c.abort();

    tracing::info!(
        overall_success = report.overall_success,
        phases_completed = report.phases_completed,
        phases_failed = report.phases_failed,
        total_models_processed = report.total_models_processed,
        "gguf-sync finished"
    );

    if report.overall_success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
