//! Smart Home AI Core - Main Entry Point

use std::sync::Arc;

use anyhow::Context;

use smart_home_ai_core::api;
use smart_home_ai_core::constants::{APP_NAME, APP_VERSION};
use smart_home_ai_core::logic::analysis_loop::Engine;
use smart_home_ai_core::logic::config::EngineConfig;
use smart_home_ai_core::logic::model::load_classifier;
use smart_home_ai_core::logic::store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    let config = EngineConfig::load().context("Failed to load configuration")?;

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open database {:?}", config.db_path))?
        .with_event_filter(config.event_source.clone(), config.event_status.clone());
    let store = Arc::new(store);

    let classifier = load_classifier(config.model_path.as_deref(), config.model_sha256.as_deref())
        .context("Failed to load classifier")?;

    // Column mismatch between model and feature layout stops the process here
    let mut engine = Engine::new(store.clone(), store.clone(), classifier, &config)
        .context("Classifier does not match the feature layout")?;
    let status = engine.status();

    engine
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Cannot listen for Ctrl-C ({}), running until killed", e);
                std::future::pending::<()>().await;
            }
            log::info!("Shutdown requested");
        })
        .await;

    let summary = api::get_engine_status(&status);
    log::info!(
        "Stopped after {} ticks ({} processed, {} commands written, {:.2} ms avg inference)",
        summary.ticks.total,
        summary.ticks.processed,
        summary.ticks.commands_written,
        summary.model.avg_latency_ms
    );

    Ok(())
}
