//! Entry point. Wires config -> plays -> replay feed -> executor, then reports.

use anyhow::Context;
use dotenvy::dotenv;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use play_engine::broker::PaperBroker;
use play_engine::config::AppConfig;
use play_engine::feed::{MarketSnapshotProvider, ReplayFeed};
use play_engine::report::JsonlReportSink;
use play_engine::{MonitorOutcome, PlayExecutor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    // Load config
    let cfg_path = std::env::var("PLAY_ENGINE_CONFIG").unwrap_or_else(|_| "config.yaml".into());
    let cfg = AppConfig::load(&cfg_path).with_context(|| format!("load config {}", cfg_path))?;
    let state_path = cfg.state_path();
    let report_path = cfg.report_path();

    let sink = JsonlReportSink::new(&report_path)?;
    let mut feed = ReplayFeed::load(&cfg.monitor.feed_path)?;
    let mut executor =
        PlayExecutor::new(Box::new(PaperBroker::new()), Box::new(sink)).with_config(&cfg);
    info!(
        "Play engine started. Reports -> {}, snapshots -> {}",
        report_path.display(),
        state_path.display()
    );

    // First snapshot per symbol is the entry quote.
    for p in &cfg.plays {
        let Some(entry) = feed.market_snapshot(&p.symbol) else {
            error!("No market data for {}; play skipped", p.symbol);
            continue;
        };
        if let Err(e) = executor.create_play_from_natural_language(
            &p.description,
            &p.symbol,
            p.quantity,
            &entry,
            &[],
            p.confidence,
        ) {
            error!("Play for {} refused: {:#}", p.symbol, e);
        }
    }

    info!("{} plays opened", executor.store().active_len());
    let executor = Arc::new(Mutex::new(executor));

    // Periodic snapshot flush (non-blocking for the monitor loop)
    let flush_handle = tokio::spawn({
        let executor = Arc::clone(&executor);
        let path = state_path.clone();
        let every = Duration::from_secs(cfg.state.flush_interval_sec.max(1));
        async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let ex = executor.lock().await;
                if let Err(e) = ex.save_state(&path) {
                    error!("state save failed: {:#}", e);
                }
            }
        }
    });

    let poll_every = Duration::from_millis(cfg.monitor.poll_interval_ms.max(1));
    let mut poll = tokio::time::interval(poll_every);
    loop {
        tokio::select! {
            _ = poll.tick() => {
                let mut ex = executor.lock().await;
                let active = ex.active_plays();
                if active.is_empty() {
                    info!("No active plays left");
                    break;
                }
                if active.iter().all(|(_, symbol)| feed.remaining(symbol) == 0) {
                    warn!(
                        "Market feed exhausted with {} plays still active",
                        ex.store().active_len()
                    );
                    break;
                }
                for (play_id, symbol) in active {
                    let Some(snap) = feed.market_snapshot(&symbol) else { continue; };
                    let outcome = ex.monitor_and_execute_play(&play_id, &snap);
                    match &outcome {
                        MonitorOutcome::Error { error } => error!("Play {}: {}", play_id, error),
                        MonitorOutcome::PlayActive { .. } => {}
                        other => info!("Play {}: {}", play_id, serde_json::to_string(other)?),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    flush_handle.abort();
    let ex = executor.lock().await;
    if let Err(e) = ex.save_state(&state_path) {
        error!("final state save failed: {:#}", e);
    }
    println!("{}", serde_json::to_string_pretty(&ex.get_all_plays_summary())?);
    Ok(())
}
