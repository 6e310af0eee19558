// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite backend
//!
//! Bundled SQLite driver built on `rusqlite`.
//!
//! # Parameters
//!
//! - `database` -- file path, `:memory:` by default
//! - `timeout` -- busy timeout in seconds
//!
//! Data statements (`INSERT`, `UPDATE`, `DELETE`, `REPLACE`) open a
//! transaction that stays open until `commit` or `rollback`, like DB-API
//! drivers do. DDL runs in autocommit mode.

use crate::backend::{Backend, BackendError, Connection, Row, SqlValue};
use crate::format::ParamStyle;
use crate::params::ConnectParams;
use rusqlite::types::{ToSql, ToSqlOutput, Value as RawValue, ValueRef};
use std::time::Duration;

const MEMORY: &str = ":memory:";

/// SQLite driver
///
/// SQLite assigns `:1`, `:2`, ... to parameter slots in order, so both
/// `qmark` and `numeric` styles bind positionally.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    style: ParamStyle,
}

impl SqliteBackend {
    /// Driver using `?` placeholders
    pub fn new() -> Self {
        Self {
            style: ParamStyle::Qmark,
        }
    }

    /// Driver using `:N` placeholders
    pub fn numeric() -> Self {
        Self {
            style: ParamStyle::Numeric,
        }
    }
}

impl Default for SqliteBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn paramstyle(&self) -> &str {
        self.style.as_str()
    }

    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Connection>, BackendError> {
        let path = params
            .get("database")
            .map(|v| v.to_string())
            .unwrap_or_else(|| MEMORY.to_string());

        let conn = if path == MEMORY {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| {
            BackendError::Connect(format!("failed to open SQLite database at {}: {}", path, e))
        })?;

        if let Some(secs) = params.get("timeout").and_then(|v| v.as_f64()) {
            conn.busy_timeout(busy_timeout(secs)?)?;
        }

        tracing::debug!("Opened SQLite database {}", path);
        Ok(Box::new(SqliteConnection { conn }))
    }
}

/// SQLite takes the busy timeout as i32 milliseconds.
fn busy_timeout(secs: f64) -> Result<Duration, BackendError> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| d.as_millis() <= i32::MAX as u128)
        .ok_or_else(|| BackendError::Connect(format!("invalid timeout {}", secs)))
}

/// Open SQLite connection
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    fn opens_transaction(stmt: &str) -> bool {
        let keyword = stmt
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("");
        ["INSERT", "UPDATE", "DELETE", "REPLACE"]
            .iter()
            .any(|k| keyword.eq_ignore_ascii_case(k))
    }
}

impl Connection for SqliteConnection {
    fn execute(
        &mut self,
        stmt: &str,
        params: &[SqlValue],
    ) -> Result<Option<Vec<Row>>, BackendError> {
        if Self::opens_transaction(stmt) && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }

        let mut prepared = self.conn.prepare(stmt)?;
        let columns = prepared.column_count();
        let bound = rusqlite::params_from_iter(params.iter());

        if columns == 0 {
            prepared.execute(bound)?;
            return Ok(None);
        }

        let rows = prepared
            .query_map(bound, |row| {
                (0..columns)
                    .map(|i| row.get_ref(i).map(SqlValue::from))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(rows))
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), BackendError> {
        self.conn.close().map_err(|(_, e)| BackendError::Sqlite(e))
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(RawValue::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(RawValue::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(RawValue::Real(*v)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Bool(b) => ToSqlOutput::Owned(RawValue::Integer(i64::from(*b))),
        })
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(v) => SqlValue::Integer(v),
            ValueRef::Real(v) => SqlValue::Real(v),
            ValueRef::Text(b) | ValueRef::Blob(b) => {
                SqlValue::Text(String::from_utf8_lossy(b).into_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Box<dyn Connection> {
        SqliteBackend::new().connect(&ConnectParams::new()).unwrap()
    }

    fn count(conn: &mut dyn Connection) -> i64 {
        conn.execute("SELECT COUNT(*) FROM t", &[]).unwrap().unwrap()[0][0]
            .as_i64()
            .unwrap()
    }

    #[test]
    fn test_sqlite_execute_returns_rows_or_none() {
        let mut conn = open();

        let created = conn.execute("CREATE TABLE t (a INTEGER, b TEXT)", &[]).unwrap();
        assert!(created.is_none());

        let inserted = conn
            .execute("INSERT INTO t VALUES (?, ?)", &[SqlValue::Integer(1), "one".into()])
            .unwrap();
        assert!(inserted.is_none());
        conn.commit().unwrap();

        let rows = conn
            .execute("SELECT a, b FROM t WHERE a = ?", &[SqlValue::Integer(1)])
            .unwrap()
            .unwrap();
        assert_eq!(rows, vec![vec![SqlValue::Integer(1), SqlValue::Text("one".into())]]);

        let max = conn.execute("SELECT MAX(a) FROM t WHERE a > 5", &[]).unwrap().unwrap();
        assert_eq!(max, vec![vec![SqlValue::Null]]);
    }

    #[test]
    fn test_sqlite_rollback_discards_uncommitted_rows() {
        let mut conn = open();
        conn.execute("CREATE TABLE t (a INTEGER)", &[]).unwrap();

        conn.execute("INSERT INTO t VALUES (?)", &[SqlValue::Integer(1)]).unwrap();
        conn.rollback().unwrap();
        assert_eq!(count(conn.as_mut()), 0);

        conn.execute("INSERT INTO t VALUES (?)", &[SqlValue::Integer(2)]).unwrap();
        conn.commit().unwrap();
        assert_eq!(count(conn.as_mut()), 1);

        // Nothing open: both are no-ops
        conn.commit().unwrap();
        conn.rollback().unwrap();
    }

    #[test]
    fn test_sqlite_numeric_placeholders_bind_in_order() {
        let backend = SqliteBackend::numeric();
        assert_eq!(backend.paramstyle(), "numeric");

        let mut conn = backend.connect(&ConnectParams::new()).unwrap();
        conn.execute("CREATE TABLE t (a INTEGER, b TEXT, c BOOLEAN)", &[])
            .unwrap();
        conn.execute(
            "INSERT INTO t VALUES (:1, :2, :3)",
            &[SqlValue::Integer(5), "five".into(), true.into()],
        )
        .unwrap();
        conn.commit().unwrap();

        let rows = conn.execute("SELECT a, b, c FROM t", &[]).unwrap().unwrap();
        assert_eq!(
            rows[0],
            vec![
                SqlValue::Integer(5),
                SqlValue::Text("five".into()),
                SqlValue::Integer(1)
            ]
        );
    }

    #[test]
    fn test_sqlite_duplicate_table_is_an_error() {
        let mut conn = open();
        conn.execute("CREATE TABLE t (a INTEGER)", &[]).unwrap();

        let err = conn.execute("CREATE TABLE t (a INTEGER)", &[]).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_sqlite_connect_failure() {
        let params = ConnectParams::parse(["database:/nonexistent-dir/sub/log.db"]);
        let err = SqliteBackend::new().connect(&params).err().unwrap();
        assert!(matches!(err, BackendError::Connect(_)));
    }

    #[test]
    fn test_sqlite_timeout_out_of_range() {
        for timeout in ["timeout:3000000", "timeout:1e300", "timeout:-1"] {
            let params = ConnectParams::parse([timeout]);
            let err = SqliteBackend::new().connect(&params).err().unwrap();
            assert!(matches!(err, BackendError::Connect(_)), "{}", timeout);
        }

        let params = ConnectParams::parse(["timeout:2.5"]);
        assert!(SqliteBackend::new().connect(&params).is_ok());
        assert_eq!(busy_timeout(2.5).unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_opens_transaction() {
        assert!(SqliteConnection::opens_transaction("INSERT INTO log VALUES (?)"));
        assert!(SqliteConnection::opens_transaction("  update item SET time = ?"));
        assert!(!SqliteConnection::opens_transaction("SELECT MAX(id) FROM item;"));
        assert!(!SqliteConnection::opens_transaction("CREATE TABLE log (time INTEGER)"));
    }
}
