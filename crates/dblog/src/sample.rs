// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Observations and item value classification.

use crate::backend::SqlValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of an upstream item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    /// Numeric item, logged to `val_num`.
    Num,
    /// Boolean item, logged to `val_bool`.
    Bool,
    /// Any other type (str, list, dict, foo, ...), logged to `val_str`.
    Other(String),
}

impl ItemType {
    pub fn parse(name: &str) -> Self {
        match name {
            "num" => Self::Num,
            "bool" => Self::Bool,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for ItemType {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num => f.write_str("num"),
            Self::Bool => f.write_str("bool"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// The value slot of an observation.
///
/// Chosen from the item's declared type at ingestion, never inferred later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Numeric(f64),
    Boolean(bool),
    Text(String),
}

impl Value {
    /// Classify a raw item value by the declared item type.
    ///
    /// Returns `None` when a `num` item holds something that is not a number.
    pub fn classify(raw: &serde_json::Value, item_type: &ItemType) -> Option<Self> {
        match item_type {
            ItemType::Num => to_number(raw).map(Self::Numeric),
            ItemType::Bool => Some(Self::Boolean(truthy(raw))),
            ItemType::Other(_) => Some(Self::Text(to_text(raw))),
        }
    }

    pub fn val_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn val_num(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn val_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// `(val_str, val_num, val_bool)` columns; exactly one is non-null.
    pub fn columns(&self) -> [SqlValue; 3] {
        match self {
            Self::Text(s) => [SqlValue::Text(s.clone()), SqlValue::Null, SqlValue::Null],
            Self::Numeric(v) => [SqlValue::Null, SqlValue::Real(*v), SqlValue::Null],
            Self::Boolean(b) => [SqlValue::Null, SqlValue::Null, SqlValue::Bool(*b)],
        }
    }
}

fn to_number(raw: &serde_json::Value) -> Option<f64> {
    match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn truthy(raw: &serde_json::Value) -> bool {
    match raw {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

fn to_text(raw: &serde_json::Value) -> String {
    match raw {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One buffered observation awaiting flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Host time in epoch milliseconds
    pub timestamp_ms: i64,

    pub value: Value,
}

impl Observation {
    pub fn new(timestamp_ms: i64, value: Value) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// An upstream item as seen by DbLog.
///
/// The host's item system implements this for every item it manages.
pub trait ItemSource {
    /// Stable item identifier (e.g. "living.temperature")
    fn id(&self) -> &str;

    /// Declared item type
    fn item_type(&self) -> ItemType;

    /// Current item value
    fn value(&self) -> serde_json::Value;

    /// Whether the item's configuration carries the given attribute
    fn has_attribute(&self, name: &str) -> bool;
}
