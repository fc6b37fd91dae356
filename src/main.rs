// =============================================================================
// Crossover Alert Scanner — Main Entry Point
// =============================================================================
//
// Scans spot pairs for an EMA-stack + MACD-histogram crossover and posts an
// alert to a Telegram chat. A cycle runs on `GET /run` and, optionally, on a
// fixed interval.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod error;
mod indicators;
mod market_data;
mod notify;
mod scanner;
mod signals;
mod types;
mod watchlist;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::{ScannerConfig, Secrets, DEFAULT_CONFIG_PATH};
use crate::notify::TelegramDispatcher;
use crate::scanner::{ScanSettings, Scanner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Crossover Alert Scanner — starting up");

    let config_path =
        std::env::var("SCANNER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = ScannerConfig::load(&config_path)?;
    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;

    // Missing bot token or chat id stops here, before any cycle runs.
    let secrets = Secrets::from_env()?;

    info!(
        exchange = %config.exchange,
        fixed_symbols = ?config.fixed_symbols,
        top_volume_limit = config.top_volume_limit,
        timeframe = %config.timeframe,
        candle_limit = config.candle_limit,
        "scanner configured"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let source = market_data::connect(
        config.exchange,
        &config.quote_asset,
        secrets.exchange_api_key.clone(),
        secrets.exchange_api_secret.clone(),
    )?;
    let dispatcher = Arc::new(TelegramDispatcher::new(secrets.bot_token.clone())?);

    let scanner = Arc::new(Scanner::new(
        source,
        dispatcher,
        ScanSettings::from_config(&config, secrets.chat_id.clone()),
    ));
    let state = Arc::new(AppState::new(scanner, secrets.trigger_token.clone()));

    // ── 3. Optional scheduler ────────────────────────────────────────────
    if let Some(secs) = config.scan_interval_secs {
        let sched_state = state.clone();
        tokio::spawn(async move {
            info!(interval_secs = secs, "scheduled scanning enabled");
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                sched_state.run_cycle().await;
            }
        });
    }

    // ── 4. HTTP trigger ──────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "HTTP trigger listening");

    // ── 5. Serve until Ctrl+C ────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Crossover Alert Scanner shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => warn!("shutdown signal received — stopping gracefully"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
}
