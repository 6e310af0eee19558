// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection parameters.
//!
//! Parameters arrive as `key:value` strings. Each value is typed by trying
//! integer, then float, then falling back to the raw string.

use std::collections::BTreeMap;
use std::fmt;

/// A typed connection parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Type a raw value: integer, then float, then string.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return Self::Int(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return Self::Float(v);
        }
        Self::Str(raw.to_string())
    }

    /// Numeric view of the value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// Connection parameter set handed to [`crate::Backend::connect`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectParams {
    values: BTreeMap<String, ParamValue>,
}

impl ConnectParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list of `key:value` arguments.
    ///
    /// The key ends at the first `:`; later duplicates override earlier ones.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = arg.split_once(':').unwrap_or((arg, ""));
            params.insert(key, ParamValue::coerce(value));
        }
        params
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
