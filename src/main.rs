//! Demand signal engine: one ingestion + matching run.
//! Fetches community posts, turns them into scored demand signals, matches
//! them against a candidate catalog and prints the result as JSON on stdout.
//!
//! Logs go to stderr. `LOG_FORMAT=json` switches to JSON lines,
//! `METRICS_DUMP=1` appends the Prometheus exposition on stderr.

use anyhow::{Context, Result};
use demand_signal_engine::catalog::{CandidateSource, JsonFileCatalog, ENV_CATALOG_PATH};
use demand_signal_engine::gateway::{Gateway, ReqwestTransport, SystemClock};
use demand_signal_engine::matching::{Distribution, MatchDistributor, MatchScorer, WorkerPool};
use demand_signal_engine::metrics::Metrics;
use demand_signal_engine::pipeline::Pipeline;
use demand_signal_engine::EngineConfig;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("demand_signal_engine=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional (local runs only).
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = EngineConfig::load()?;
    let metrics = Metrics::init(cfg.gateway.cache_ttl_secs * 1000)?;

    let transport = ReqwestTransport::new(
        &cfg.gateway.user_agent,
        Duration::from_secs(cfg.gateway.request_timeout_secs.max(1)),
    )
    .context("building HTTP client")?;
    let gateway = Gateway::spawn(
        Arc::new(transport),
        Arc::new(SystemClock),
        cfg.gateway_config(),
    );

    let batch = Pipeline::new(gateway).run(&cfg.ingest).await;

    let catalog_path = std::env::var(ENV_CATALOG_PATH)
        .ok()
        .map(PathBuf::from)
        .or_else(|| cfg.matching.catalog_path.clone());
    let distribution = match catalog_path {
        Some(path) => {
            let candidates = JsonFileCatalog::new(path).load().await?;
            let pool = WorkerPool::new(cfg.matching.workers).context("starting match workers")?;
            let distributor = MatchDistributor::new(
                pool,
                Arc::new(MatchScorer::new(cfg.matching.min_match_score)),
                cfg.matching.max_results,
            );
            info!(
                candidates = candidates.len(),
                signals = batch.signals.len(),
                workers = distributor.workers(),
                "matching"
            );
            distributor.distribute(&candidates, &batch.signals).await?
        }
        None => {
            warn!("no candidate catalog configured; skipping matching");
            Distribution::default()
        }
    };

    let out = json!({
        "signals": batch.signals,
        "stats": batch.stats,
        "gateway": batch.gateway,
        "threads": batch.threads,
        "matches": distribution.matches,
        "chunkErrors": distribution.chunk_errors,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    if std::env::var("METRICS_DUMP").is_ok_and(|v| v == "1") {
        eprintln!("{}", metrics.render());
    }
    Ok(())
}
