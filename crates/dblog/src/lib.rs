// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DbLog - Buffered Time-Series Logger
//!
//! Sits between a live item source and a relational database. Item updates
//! are buffered in memory and flushed periodically into two tables: an
//! append-only `log` of every observation and an `item` table holding the
//! latest snapshot per item.
//!
//! # Features
//!
//! - **Low contention** -- producers only take a short buffer lock
//! - **Backend portable** -- `qmark`, `format` and `numeric` parameter styles
//! - **Failure isolation** -- one failing item never aborts a flush cycle
//! - **SQLite backend** -- bundled, zero-setup driver via `rusqlite`
//!
//! # Architecture
//!
//! ```text
//! DbLog
//! +-- SampleBuffer        (per-item queue of pending observations)
//! +-- IdentifierRegistry  (item name -> integer id, snapshot cache)
//! +-- Executor            (statement formatting for the driver's paramstyle)
//! +-- Connection          (single backend connection, behind one lock)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dblog::{DbLog, DbLogConfig, ItemType, SqliteBackend};
//! use serde_json::json;
//!
//! let config = DbLogConfig::builder()
//!     .connect("database:smarthome.db")
//!     .cycle_secs(10)
//!     .build();
//!
//! let dblog = DbLog::new(&SqliteBackend::new(), &config)?;
//! dblog.observe("living.temperature", &json!(21.5), &ItemType::Num);
//! dblog.flush();
//! dblog.close();
//! ```

pub mod backend;
pub mod buffer;
pub mod clock;
pub mod config;
pub mod dblog;
pub mod error;
pub mod format;
pub mod params;
pub mod registry;
pub mod sample;
pub mod sqlite;
pub mod timer;

pub use backend::{backend_for, Backend, BackendError, Connection, Executor, Row, SqlValue};
pub use buffer::SampleBuffer;
pub use clock::{datetime_from_ms, timestamp_ms, Clock, MockClock, SystemClock};
pub use config::{ConfigError, DbLogConfig};
pub use dblog::{DbLog, DbLogStats, FlushReport, SchemaReport, ATTRIBUTE};
pub use error::DbLogError;
pub use format::ParamStyle;
pub use params::{ConnectParams, ParamValue};
pub use registry::{IdentifierRegistry, ItemSnapshot};
pub use sample::{ItemSource, ItemType, Observation, Value};
pub use sqlite::SqliteBackend;
pub use timer::FlushTimer;
