// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DbLog CLI
//!
//! Reads item updates as JSON lines from stdin and logs them to a database.
//!
//! # Usage
//!
//! ```bash
//! # Log into a SQLite file, flushing every 10 seconds
//! sensor-feed | dblog --connect database:smarthome.db
//!
//! # Use a TOML configuration file and a faster cycle
//! dblog --config dblog.toml --cycle 2 < updates.jsonl
//! ```
//!
//! Each input line looks like:
//!
//! ```json
//! {"item": "living.temperature", "type": "num", "value": 21.5}
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use dblog::{backend_for, DbLog, DbLogConfig, FlushTimer, ItemType};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "dblog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "DbLog - buffered time-series logging into SQL databases", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend driver (overrides the config file)
    #[arg(short, long)]
    backend: Option<String>,

    /// Connection parameter as key:value (repeatable, overrides the config file)
    #[arg(short = 'C', long = "connect")]
    connect: Vec<String>,

    /// Flush interval in seconds (overrides the config file)
    #[arg(long)]
    cycle: Option<u64>,
}

/// One update read from stdin.
#[derive(Debug, Deserialize)]
struct Update {
    item: String,
    #[serde(rename = "type", default = "default_type")]
    item_type: String,
    value: serde_json::Value,
}

fn default_type() -> String {
    "str".to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DbLogConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DbLogConfig::default(),
    };
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if !args.connect.is_empty() {
        config.connect = args.connect;
    }
    if let Some(cycle) = args.cycle {
        config.cycle_secs = cycle;
    }

    let backend = backend_for(&config.backend)?;
    let dblog = Arc::new(DbLog::new(backend.as_ref(), &config)?);
    if !dblog.is_connected() {
        tracing::warn!("Database unavailable, updates will be discarded");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let timer = tokio::spawn(FlushTimer::new(Arc::clone(&dblog)).run(shutdown_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => ingest(&dblog, &line),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let report = timer.await.context("Flush timer panicked")?;

    let stats = dblog.stats();
    tracing::info!(
        "Final dump wrote {} samples; {} observed, {} written, {} dropped in total",
        report.samples_written,
        stats.samples_observed,
        stats.samples_written,
        stats.samples_dropped
    );

    Ok(())
}

fn ingest(dblog: &DbLog, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match serde_json::from_str::<Update>(line) {
        Ok(update) => {
            dblog.observe(&update.item, &update.value, &ItemType::parse(&update.item_type))
        }
        Err(e) => tracing::warn!("Skipping malformed update {:?}: {}", line, e),
    }
}
