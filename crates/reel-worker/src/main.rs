//! Pipeline worker binary.
//!
//! Usage: `reel-worker <qualify|audio|render|all> <record-id>...`

use anyhow::bail;
use futures::future::join_all;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_models::RecordId;
use reel_worker::metrics::init_metrics;
use reel_worker::{Stage, StageRunner, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let mut args = std::env::args().skip(1);
    let stage: Stage = match args.next() {
        Some(stage) => stage.parse()?,
        None => bail!("usage: reel-worker <qualify|audio|render|all> <record-id>..."),
    };
    let record_ids: Vec<RecordId> = args.map(RecordId::from).collect();
    if record_ids.is_empty() {
        bail!("no record ids given");
    }

    if let Some(port) = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
    {
        init_metrics(port).map_err(anyhow::Error::msg)?;
        info!(port, "Prometheus metrics listener started");
    }

    let config = WorkerConfig::from_env()?;
    info!("Worker config: {:?}", config);

    let runner = StageRunner::from_env(config)?;

    info!(stage = %stage, records = record_ids.len(), "Starting reel-worker");

    // Records run concurrently and share the runner's synthesis permits.
    let results = join_all(record_ids.iter().map(|id| runner.run(stage, id))).await;

    let mut failed = 0;
    let mut retryable = 0;
    for (id, result) in record_ids.iter().zip(results) {
        if let Err(e) = result {
            failed += 1;
            if e.is_retryable() {
                retryable += 1;
                warn!(record_id = %id, stage = %stage, error = %e, "Stage failed, safe to rerun");
            } else {
                error!(record_id = %id, stage = %stage, error = %e, "Stage failed");
            }
        }
    }

    if failed > 0 {
        bail!(
            "{} of {} record(s) failed ({} retryable)",
            failed,
            record_ids.len(),
            retryable
        );
    }

    info!(stage = %stage, "All records processed");
    Ok(())
}

/// Colored output for dev, JSON for production.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("reel=info".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("aws_smithy_runtime=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}
