// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Backend Interface Abstraction
//!
//! Drivers expose a small DB-API-like capability set: connect, execute,
//! commit, rollback and close. DbLog only talks to the database through
//! these traits, so any relational driver can be plugged in.
//!
//! # Integration
//!
//! ```ignore
//! impl Backend for MyDriver {
//!     fn name(&self) -> &str { "mydriver" }
//!     fn paramstyle(&self) -> &str { "format" }
//!     fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Connection>, BackendError> {
//!         // Open a real connection...
//!     }
//! }
//! ```

use crate::config::ConfigError;
use crate::format::ParamStyle;
use crate::params::ConnectParams;
use crate::sqlite::SqliteBackend;
use thiserror::Error;

/// Driver-level failures.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection is closed")]
    Closed,

    #[error("{0}")]
    Driver(String),
}

/// A single bound parameter or result column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One result row.
pub type Row = Vec<SqlValue>;

/// An open database connection.
///
/// Connections are never shared between threads concurrently; DbLog keeps
/// its single connection behind a mutex.
pub trait Connection: Send {
    /// Execute one statement written in the driver's parameter style.
    ///
    /// Returns the result rows for statements producing columns, `None`
    /// otherwise. DML opens a transaction that lasts until `commit`.
    fn execute(&mut self, stmt: &str, params: &[SqlValue])
        -> Result<Option<Vec<Row>>, BackendError>;

    /// Commit the open transaction, if any.
    fn commit(&mut self) -> Result<(), BackendError>;

    /// Discard the open transaction, if any.
    fn rollback(&mut self) -> Result<(), BackendError>;

    /// Close the connection.
    fn close(self: Box<Self>) -> Result<(), BackendError>;
}

/// A database driver.
pub trait Backend: Send + Sync {
    /// Driver name, for logging.
    fn name(&self) -> &str;

    /// DB-API parameter style name (e.g. "qmark", "format", "numeric").
    fn paramstyle(&self) -> &str;

    /// Open a connection.
    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Connection>, BackendError>;
}

/// Look up a built-in backend by driver name.
pub fn backend_for(name: &str) -> Result<Box<dyn Backend>, ConfigError> {
    match name.to_ascii_lowercase().as_str() {
        "sqlite" | "sqlite3" => Ok(Box::new(SqliteBackend::new())),
        other => Err(ConfigError::UnknownBackend(other.to_string())),
    }
}

/// Runs neutral `?` statements against a connection, rewritten for its
/// parameter style.
pub struct Executor<'c> {
    conn: &'c mut dyn Connection,
    style: ParamStyle,
}

impl<'c> Executor<'c> {
    pub fn new(conn: &'c mut dyn Connection, style: ParamStyle) -> Self {
        Self { conn, style }
    }

    pub fn style(&self) -> ParamStyle {
        self.style
    }

    pub fn execute(
        &mut self,
        stmt: &str,
        params: &[SqlValue],
    ) -> Result<Option<Vec<Row>>, BackendError> {
        let stmt = self.style.format(stmt);
        self.conn.execute(&stmt, params)
    }

    /// Execute and return the first row, if any.
    pub fn fetch_one(
        &mut self,
        stmt: &str,
        params: &[SqlValue],
    ) -> Result<Option<Row>, BackendError> {
        Ok(self
            .execute(stmt, params)?
            .and_then(|rows| rows.into_iter().next()))
    }

    pub fn commit(&mut self) -> Result<(), BackendError> {
        self.conn.commit()
    }

    pub fn rollback(&mut self) -> Result<(), BackendError> {
        self.conn.rollback()
    }
}
