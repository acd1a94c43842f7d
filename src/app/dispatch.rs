use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use shortlinks::Config;
use shortlinks::gateway::{self, AppState};
use shortlinks::logs::{RequestLogBuffer, SqliteLogStore};
use shortlinks::retention::{CleanupEngine, Scheduler, run_with_timeout};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            serve(&config, &host, port).await
        }
        Commands::Cleanup => cleanup(&config).await,
        Commands::Aggregate { date } => aggregate(&config, date).await,
    }
}

async fn open_store(config: &Config) -> Result<Arc<SqliteLogStore>> {
    let path = config.database_path();
    let store = SqliteLogStore::open(&path, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open request log database {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_engine(config: &Config, store: &Arc<SqliteLogStore>) -> Result<CleanupEngine> {
    CleanupEngine::from_config(store.clone(), &config.retention)
        .context("invalid [retention] settings")
}

/// Gateway plus background retention until Ctrl-C.
///
/// Shutdown order: stop accepting requests, stop the scheduler (an in-flight
/// run finishes on its own), flush buffered request logs, close the pool.
async fn serve(config: &Config, host: &str, port: u16) -> Result<()> {
    let store = open_store(config).await?;

    let scheduler = if config.retention.enabled {
        let engine = build_engine(config, &store)?;
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(engine),
            config.retention.interval(),
            config.retention.run_timeout(),
        ));
        scheduler.start();
        Some(scheduler)
    } else {
        info!("retention scheduler disabled");
        None
    };

    let buffer = config
        .request_log
        .enabled
        .then(|| Arc::new(RequestLogBuffer::from_config(store.clone(), &config.request_log)));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                signal.cancel();
            }
            Err(e) => warn!("failed to listen for Ctrl-C: {e}"),
        }
    });

    let state = AppState {
        store: store.clone(),
        buffer: buffer.clone(),
        scheduler: scheduler.clone(),
    };
    let result = gateway::run_gateway(host, port, state, shutdown).await;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    if let Some(buffer) = buffer {
        let flushed = buffer.drain().await;
        info!(
            flushed,
            dropped = buffer.dropped_records(),
            "request log buffer drained"
        );
    }
    store.close().await;

    result
}

async fn cleanup(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let engine = build_engine(config, &store)?;

    let result = run_with_timeout(&engine, Utc::now(), config.retention.run_timeout()).await;
    store.close().await;

    let report = result.context("cleanup run failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn aggregate(config: &Config, date: NaiveDate) -> Result<()> {
    let store = open_store(config).await?;
    let engine = build_engine(config, &store)?;

    let result = engine.aggregate(date).await;
    store.close().await;

    match result.with_context(|| format!("failed to aggregate {date}"))? {
        Some(aggregate) => println!("{}", serde_json::to_string_pretty(&aggregate)?),
        None => println!("No request logs recorded for {date}."),
    }
    Ok(())
}
