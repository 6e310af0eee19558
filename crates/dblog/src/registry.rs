// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Item name to integer id mapping.
//!
//! Ids are allocated as `MAX(id) + 1` (or 1 on an empty table) the first
//! time an item is flushed. Resolution is not safe against two flushers
//! creating the same name concurrently; DbLog serializes all flush work
//! behind its connection lock.

use crate::backend::{BackendError, Executor, SqlValue};
use crate::sample::Value;
use std::collections::HashMap;

const SELECT_ID: &str = "SELECT id FROM item WHERE name = ?;";
const SELECT_MAX_ID: &str = "SELECT MAX(id) FROM item;";
const INSERT_ITEM: &str = "INSERT INTO item(id, name) VALUES(?,?);";

/// Last committed state of an item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    pub id: i64,
    /// Epoch milliseconds of the latest observation
    pub time: i64,
    pub value: Value,
}

/// Name to id cache backed by the `item` table.
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    ids: HashMap<String, i64>,
    snapshots: HashMap<String, ItemSnapshot>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` to its id, creating the `item` row if needed.
    ///
    /// The created row is part of the caller's open transaction; the cache
    /// is only updated through [`IdentifierRegistry::remember`] once that
    /// transaction commits.
    pub fn resolve(&self, exec: &mut Executor<'_>, name: &str) -> Result<i64, BackendError> {
        if let Some(id) = self.ids.get(name) {
            return Ok(*id);
        }

        if let Some(id) = Self::select_id(exec, name)? {
            return Ok(id);
        }

        let next_id = exec
            .fetch_one(SELECT_MAX_ID, &[])?
            .and_then(|row| row.first().and_then(SqlValue::as_i64))
            .map_or(1, |max| max + 1);

        exec.execute(INSERT_ITEM, &[SqlValue::Integer(next_id), name.into()])?;
        tracing::debug!("Created item {} with id {}", name, next_id);

        Self::select_id(exec, name)?.ok_or_else(|| {
            BackendError::Driver(format!("item {} not found after insert", name))
        })
    }

    fn select_id(exec: &mut Executor<'_>, name: &str) -> Result<Option<i64>, BackendError> {
        Ok(exec
            .fetch_one(SELECT_ID, &[name.into()])?
            .and_then(|row| row.first().and_then(SqlValue::as_i64)))
    }

    /// Record a committed snapshot, caching the item's id.
    pub fn remember(&mut self, name: &str, snapshot: ItemSnapshot) {
        self.ids.insert(name.to_string(), snapshot.id);
        self.snapshots.insert(name.to_string(), snapshot);
    }

    /// Cached id of `name`, if it has been committed by this instance.
    pub fn cached_id(&self, name: &str) -> Option<i64> {
        self.ids.get(name).copied()
    }

    pub fn snapshot(&self, name: &str) -> Option<&ItemSnapshot> {
        self.snapshots.get(name)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, Connection};
    use crate::format::ParamStyle;
    use crate::params::ConnectParams;
    use crate::sqlite::SqliteBackend;

    fn open(backend: &SqliteBackend) -> Box<dyn Connection> {
        let mut conn = backend.connect(&ConnectParams::new()).unwrap();
        conn.execute(
            "CREATE TABLE item (id INTEGER, name varchar(255), time INTEGER, val_str TEXT, val_num REAL, val_bool BOOLEAN);",
            &[],
        )
        .unwrap();
        conn
    }

    fn item_rows(conn: &mut dyn Connection) -> i64 {
        conn.execute("SELECT COUNT(*) FROM item", &[]).unwrap().unwrap()[0][0]
            .as_i64()
            .unwrap()
    }

    #[test]
    fn test_resolve_allocates_sequential_ids() {
        let mut conn = open(&SqliteBackend::new());
        let registry = IdentifierRegistry::new();

        let mut exec = Executor::new(conn.as_mut(), ParamStyle::Qmark);
        assert_eq!(registry.resolve(&mut exec, "temp1").unwrap(), 1);
        assert_eq!(registry.resolve(&mut exec, "temp2").unwrap(), 2);
        assert_eq!(registry.resolve(&mut exec, "temp1").unwrap(), 1);
        exec.commit().unwrap();

        assert_eq!(item_rows(conn.as_mut()), 2);
    }

    #[test]
    fn test_resolve_continues_after_existing_max() {
        let mut conn = open(&SqliteBackend::new());
        conn.execute(
            "INSERT INTO item(id, name) VALUES(?,?);",
            &[SqlValue::Integer(41), "legacy".into()],
        )
        .unwrap();
        conn.commit().unwrap();

        let registry = IdentifierRegistry::new();
        let mut exec = Executor::new(conn.as_mut(), ParamStyle::Qmark);
        assert_eq!(registry.resolve(&mut exec, "legacy").unwrap(), 41);
        assert_eq!(registry.resolve(&mut exec, "fresh").unwrap(), 42);
    }

    #[test]
    fn test_resolve_with_numeric_style() {
        let backend = SqliteBackend::numeric();
        let mut conn = open(&backend);
        let registry = IdentifierRegistry::new();

        let mut exec = Executor::new(conn.as_mut(), ParamStyle::Numeric);
        assert_eq!(registry.resolve(&mut exec, "a").unwrap(), 1);
        assert_eq!(registry.resolve(&mut exec, "b").unwrap(), 2);
    }

    #[test]
    fn test_cache_only_after_remember() {
        let mut conn = open(&SqliteBackend::new());
        let mut registry = IdentifierRegistry::new();

        {
            let mut exec = Executor::new(conn.as_mut(), ParamStyle::Qmark);
            let id = registry.resolve(&mut exec, "door").unwrap();
            assert_eq!(registry.cached_id("door"), None);
            exec.rollback().unwrap();

            // Row was rolled back, so the name resolves to a fresh allocation
            assert_eq!(registry.resolve(&mut exec, "door").unwrap(), id);
            exec.commit().unwrap();
        }

        registry.remember(
            "door",
            ItemSnapshot {
                id: 1,
                time: 1_000,
                value: Value::Boolean(true),
            },
        );
        assert_eq!(registry.cached_id("door"), Some(1));
        assert_eq!(registry.snapshot("door").unwrap().time, 1_000);
        assert_eq!(registry.len(), 1);
        assert_eq!(item_rows(conn.as_mut()), 1);
    }
}
