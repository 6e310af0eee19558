// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic flush driver.
//!
//! Calls [`DbLog::flush`] on the blocking pool every cycle. Ticks never
//! overlap: a slow flush delays the next tick instead of stacking up.
//! On shutdown it runs the final flush and closes the connection.

use crate::dblog::{DbLog, FlushReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

pub struct FlushTimer {
    dblog: Arc<DbLog>,
    cycle: Duration,
}

impl FlushTimer {
    /// Timer firing at the instance's configured cycle.
    pub fn new(dblog: Arc<DbLog>) -> Self {
        let cycle = dblog.cycle();
        Self { dblog, cycle }
    }

    /// Override the flush interval.
    pub fn with_cycle(mut self, cycle: Duration) -> Self {
        if !cycle.is_zero() {
            self.cycle = cycle;
        }
        self
    }

    pub fn cycle(&self) -> Duration {
        self.cycle
    }

    /// Flush every cycle until `shutdown` turns true or its sender is dropped.
    ///
    /// Returns the report of the final flush performed by [`DbLog::close`].
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> FlushReport {
        let mut interval = tokio::time::interval(self.cycle);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        tracing::info!("DbLog dump every {:?}", self.cycle);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let dblog = Arc::clone(&self.dblog);
                    match tokio::task::spawn_blocking(move || dblog.flush()).await {
                        Ok(report) if report.items_failed > 0 => {
                            tracing::debug!(
                                "DbLog dump: {} items written, {} failed",
                                report.items_flushed,
                                report.items_failed
                            );
                        }
                        Ok(report) => {
                            tracing::trace!("DbLog dump: {} samples written", report.samples_written);
                        }
                        Err(e) => tracing::error!("DbLog dump task failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("DbLog stopping");
        let dblog = self.dblog;
        match tokio::task::spawn_blocking(move || dblog.close()).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("DbLog final dump failed: {}", e);
                FlushReport::default()
            }
        }
    }
}
