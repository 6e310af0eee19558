// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Statement formatting for driver parameter styles.
//!
//! Statements are written once with `?` placeholders and rewritten for the
//! convention the active driver expects.

use crate::config::ConfigError;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Parameter styles understood by the formatter.
pub const SUPPORTED_STYLES: [&str; 3] = ["qmark", "format", "numeric"];

/// Placeholder convention of a backend driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `?` placeholders, passed through unchanged.
    Qmark,
    /// printf-style `%s` markers.
    Format,
    /// `:1`, `:2`, ... in occurrence order.
    Numeric,
}

impl ParamStyle {
    /// Style name as reported by drivers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qmark => "qmark",
            Self::Format => "format",
            Self::Numeric => "numeric",
        }
    }

    /// Rewrite every `?` placeholder in `stmt` for this style.
    pub fn format(self, stmt: &str) -> Cow<'_, str> {
        if !stmt.contains('?') {
            return Cow::Borrowed(stmt);
        }

        match self {
            Self::Qmark => Cow::Borrowed(stmt),
            Self::Format => Cow::Owned(stmt.replace('?', "%s")),
            Self::Numeric => {
                let mut out = String::with_capacity(stmt.len() + 8);
                let mut position = 0usize;
                for ch in stmt.chars() {
                    if ch == '?' {
                        position += 1;
                        out.push(':');
                        out.push_str(&position.to_string());
                    } else {
                        out.push(ch);
                    }
                }
                Cow::Owned(out)
            }
        }
    }
}

impl fmt::Display for ParamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qmark" => Ok(Self::Qmark),
            "format" => Ok(Self::Format),
            "numeric" => Ok(Self::Numeric),
            other => Err(ConfigError::UnsupportedStyle {
                style: other.to_string(),
            }),
        }
    }
}
