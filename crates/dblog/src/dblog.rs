// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Buffer-and-flush engine.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE log (time INTEGER, item_id INTEGER, val_str TEXT, val_num REAL, val_bool BOOLEAN);
//! CREATE TABLE item (id INTEGER, name varchar(255), time INTEGER, val_str TEXT, val_num REAL, val_bool BOOLEAN);
//! CREATE INDEX log_item_id ON log (item_id);
//! CREATE INDEX item_name ON item (name);
//! ```
//!
//! # Locking
//!
//! Two locks: the buffer lock (inside [`SampleBuffer`]) is held only to
//! append or drain, and the session lock guards every use of the backend
//! connection: schema setup, each item of a flush, and close.

use crate::backend::{Backend, BackendError, Connection, Executor, SqlValue};
use crate::buffer::SampleBuffer;
use crate::clock::{now_ms, Clock, SystemClock};
use crate::config::{ConfigError, DbLogConfig};
use crate::error::DbLogError;
use crate::format::ParamStyle;
use crate::params::ConnectParams;
use crate::registry::{IdentifierRegistry, ItemSnapshot};
use crate::sample::{ItemSource, ItemType, Observation, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Item attribute that opts an item into logging.
pub const ATTRIBUTE: &str = "dblog";

const SCHEMA: [(&str, &str); 4] = [
    (
        "create_db_log",
        "CREATE TABLE log (time INTEGER, item_id INTEGER, val_str TEXT, val_num REAL, val_bool BOOLEAN);",
    ),
    (
        "create_db_item",
        "CREATE TABLE item (id INTEGER, name varchar(255), time INTEGER, val_str TEXT, val_num REAL, val_bool BOOLEAN);",
    ),
    (
        "create_index_log",
        "CREATE INDEX log_item_id ON log (item_id);",
    ),
    (
        "create_index_item",
        "CREATE INDEX item_name ON item (name);",
    ),
];

// time, item_id, val_str, val_num, val_bool
const INSERT_LOG: &str = "INSERT INTO log VALUES (?,?,?,?,?);";
const UPDATE_ITEM: &str =
    "UPDATE item SET time = ?, val_str = ?, val_num = ?, val_bool = ? WHERE id = ?;";

/// Outcome of one flush cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Items committed.
    pub items_flushed: usize,
    /// Log rows committed.
    pub samples_written: usize,
    /// Items whose write failed.
    pub items_failed: usize,
    /// Drained observations lost with failed items.
    pub samples_dropped: usize,
}

/// Cumulative statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbLogStats {
    /// Observations accepted into the buffer.
    pub samples_observed: u64,
    /// Updates discarded before buffering (disconnected or not classifiable).
    pub samples_discarded: u64,
    pub samples_written: u64,
    pub samples_dropped: u64,
    pub items_failed: u64,
    pub flush_cycles: u64,
}

/// Outcome of running the schema statements.
#[derive(Debug, Default)]
pub struct SchemaReport {
    /// Statements that succeeded.
    pub created: Vec<&'static str>,
    /// Statements that failed, as [`DbLogError::SchemaSetup`].
    pub failed: Vec<DbLogError>,
}

/// Connection plus the id registry, both only touched under the session lock.
struct Session {
    conn: Option<Box<dyn Connection>>,
    registry: IdentifierRegistry,
}

/// Buffered time-series logger.
///
/// Producers call [`DbLog::observe`] from any thread; a timer calls
/// [`DbLog::flush`] every cycle; the host calls [`DbLog::close`] once at
/// shutdown. If the initial connect fails the instance stays disconnected
/// for its whole lifetime.
pub struct DbLog {
    backend: String,
    style: ParamStyle,
    cycle: Duration,
    connected: AtomicBool,
    buffer: SampleBuffer,
    session: Mutex<Session>,
    clock: Arc<dyn Clock>,
    stats: Mutex<DbLogStats>,
}

impl DbLog {
    /// Connect and create the schema.
    ///
    /// Only configuration problems are returned as errors. A failed connect
    /// is logged and leaves a disconnected instance.
    pub fn new(backend: &dyn Backend, config: &DbLogConfig) -> Result<Self, DbLogError> {
        Self::with_clock(backend, config, Arc::new(SystemClock))
    }

    /// Like [`DbLog::new`] with an explicit time source.
    pub fn with_clock(
        backend: &dyn Backend,
        config: &DbLogConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DbLogError> {
        config.validate()?;

        let style: ParamStyle = backend.paramstyle().parse().map_err(|e: ConfigError| {
            tracing::error!("DbLog: {}", e);
            e
        })?;
        let params = ConnectParams::parse(&config.connect);

        let dblog = Self {
            backend: backend.name().to_string(),
            style,
            cycle: config.cycle(),
            connected: AtomicBool::new(false),
            buffer: SampleBuffer::new(),
            session: Mutex::new(Session {
                conn: None,
                registry: IdentifierRegistry::new(),
            }),
            clock,
            stats: Mutex::new(DbLogStats::default()),
        };
        dblog.open(backend, &params);

        Ok(dblog)
    }

    fn open(&self, backend: &dyn Backend, params: &ConnectParams) {
        let mut session = self.session.lock();

        let mut conn = match backend.connect(params) {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("{}", DbLogError::Connection(e));
                return;
            }
        };

        tracing::info!(
            "DbLog: Connected using {} (using {} style)!",
            backend.name(),
            self.style
        );
        Self::run_schema(conn.as_mut(), self.style);

        session.conn = Some(conn);
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Run the schema statements again.
    ///
    /// Every statement is attempted; failures are logged and collected.
    pub fn create_schema(&self) -> Result<SchemaReport, DbLogError> {
        let mut session = self.session.lock();
        let conn = session.conn.as_deref_mut().ok_or(DbLogError::NotConnected)?;
        Ok(Self::run_schema(conn, self.style))
    }

    fn run_schema(conn: &mut dyn Connection, style: ParamStyle) -> SchemaReport {
        let mut report = SchemaReport::default();
        let mut exec = Executor::new(conn, style);

        for (name, stmt) in SCHEMA {
            match exec.execute(stmt, &[]).and_then(|_| exec.commit()) {
                Ok(()) => report.created.push(name),
                Err(source) => {
                    if let Err(e) = exec.rollback() {
                        tracing::warn!("DbLog: rollback after {} failed: {}", name, e);
                    }
                    let err = DbLogError::SchemaSetup { name, source };
                    tracing::warn!("{}", err);
                    report.failed.push(err);
                }
            }
        }

        report
    }

    /// Register an item if its configuration carries the `dblog` attribute.
    ///
    /// Returns true when the host should route the item's updates to
    /// [`DbLog::update_item`].
    pub fn parse_item(&self, item: &dyn ItemSource) -> bool {
        if !item.has_attribute(ATTRIBUTE) {
            return false;
        }
        self.buffer.register(item.id());
        true
    }

    /// Buffer the current value of an item.
    pub fn update_item(&self, item: &dyn ItemSource) {
        self.observe(item.id(), &item.value(), &item.item_type());
    }

    /// Classify `raw` by `item_type`, stamp it with the host time and buffer it.
    ///
    /// Never fails: values that cannot be classified are logged and dropped.
    pub fn observe(&self, item: &str, raw: &serde_json::Value, item_type: &ItemType) {
        match Value::classify(raw, item_type) {
            Some(value) => self.observe_value(item, value),
            None => {
                tracing::warn!(
                    "DbLog: cannot log value {} of {} item {}",
                    raw,
                    item_type,
                    item
                );
                self.stats.lock().samples_discarded += 1;
            }
        }
    }

    /// Buffer an already classified value.
    ///
    /// Updates are discarded while disconnected: nothing drains the buffer
    /// once the connection is gone, so it would only grow.
    pub fn observe_value(&self, item: &str, value: Value) {
        if !self.is_connected() {
            tracing::trace!("DbLog: not connected, discarding update of {}", item);
            self.stats.lock().samples_discarded += 1;
            return;
        }

        let observation = Observation::new(now_ms(self.clock.as_ref()), value);
        self.buffer.append(item, observation);
        self.stats.lock().samples_observed += 1;
    }

    /// Write all pending observations.
    ///
    /// Items are drained one at a time and written under the session lock.
    /// A failing item is rolled back and logged; its drained observations
    /// are lost and the remaining items are still flushed.
    pub fn flush(&self) -> FlushReport {
        let mut report = FlushReport::default();
        if !self.is_connected() {
            return report;
        }

        tracing::debug!("DbLog: starting dump");
        for item in self.buffer.items() {
            let samples = self.buffer.drain(&item);
            if samples.is_empty() {
                continue;
            }

            let mut session = self.session.lock();
            match Self::flush_item(&mut session, self.style, &item, &samples) {
                Ok(_) => {
                    report.items_flushed += 1;
                    report.samples_written += samples.len();
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.items_failed += 1;
                    report.samples_dropped += samples.len();
                }
            }
        }

        let mut stats = self.stats.lock();
        stats.flush_cycles += 1;
        stats.samples_written += report.samples_written as u64;
        stats.samples_dropped += report.samples_dropped as u64;
        stats.items_failed += report.items_failed as u64;

        report
    }

    fn flush_item(
        session: &mut Session,
        style: ParamStyle,
        item: &str,
        samples: &[Observation],
    ) -> Result<i64, DbLogError> {
        let Session { conn, registry } = session;
        let conn = conn.as_deref_mut().ok_or(DbLogError::NotConnected)?;
        let mut exec = Executor::new(conn, style);

        match Self::write_item(&mut exec, registry, item, samples) {
            Ok(snapshot) => {
                let id = snapshot.id;
                registry.remember(item, snapshot);
                Ok(id)
            }
            Err(source) => {
                if let Err(e) = exec.rollback() {
                    tracing::warn!("DbLog: rollback for {} failed: {}", item, e);
                }
                Err(DbLogError::FlushItem {
                    item: item.to_string(),
                    source,
                })
            }
        }
    }

    fn write_item(
        exec: &mut Executor<'_>,
        registry: &IdentifierRegistry,
        item: &str,
        samples: &[Observation],
    ) -> Result<ItemSnapshot, BackendError> {
        let last = samples
            .last()
            .ok_or_else(|| BackendError::Driver(format!("no samples for {}", item)))?;

        let id = registry.resolve(exec, item)?;
        tracing::debug!(
            "DbLog: Dumping {}/{} with {} values",
            item,
            id,
            samples.len()
        );

        for sample in samples {
            let [val_str, val_num, val_bool] = sample.value.columns();
            exec.execute(
                INSERT_LOG,
                &[
                    SqlValue::Integer(sample.timestamp_ms),
                    SqlValue::Integer(id),
                    val_str,
                    val_num,
                    val_bool,
                ],
            )?;
        }

        let [val_str, val_num, val_bool] = last.value.columns();
        exec.execute(
            UPDATE_ITEM,
            &[
                SqlValue::Integer(last.timestamp_ms),
                val_str,
                val_num,
                val_bool,
                SqlValue::Integer(id),
            ],
        )?;
        exec.commit()?;

        Ok(ItemSnapshot {
            id,
            time: last.timestamp_ms,
            value: last.value.clone(),
        })
    }

    /// Final flush, then close the connection.
    ///
    /// The instance is disconnected afterwards even if closing fails.
    pub fn close(&self) -> FlushReport {
        let report = self.flush();

        let mut session = self.session.lock();
        if let Some(conn) = session.conn.take() {
            match conn.close() {
                Ok(()) => tracing::info!("DbLog: Closed {} connection", self.backend),
                Err(e) => tracing::warn!("{}", DbLogError::Close(e)),
            }
        }
        self.connected.store(false, Ordering::SeqCst);

        report
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Backend driver name
    pub fn backend_name(&self) -> &str {
        &self.backend
    }

    pub fn param_style(&self) -> ParamStyle {
        self.style
    }

    /// Configured flush interval
    pub fn cycle(&self) -> Duration {
        self.cycle
    }

    /// Pending observations for one item
    pub fn pending(&self, item: &str) -> usize {
        self.buffer.pending(item)
    }

    pub fn total_pending(&self) -> usize {
        self.buffer.total_pending()
    }

    /// Id of an item flushed by this instance
    pub fn item_id(&self, item: &str) -> Option<i64> {
        self.session.lock().registry.cached_id(item)
    }

    /// Last committed value and time of an item
    pub fn last_value(&self, item: &str) -> Option<ItemSnapshot> {
        self.session.lock().registry.snapshot(item).cloned()
    }

    pub fn stats(&self) -> DbLogStats {
        *self.stats.lock()
    }
}
