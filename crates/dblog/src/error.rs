// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DbLog error kinds.
//!
//! Only [`DbLogError::Configuration`] ever reaches a caller (from
//! [`crate::DbLog::new`]). The other kinds are reported through logging and
//! the flush/schema reports.

use crate::backend::BackendError;
use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbLogError {
    /// Unsupported parameter style or invalid settings; fatal at construction.
    #[error("DbLog: {0}")]
    Configuration(#[from] ConfigError),

    /// Initial connect failed; the instance stays disconnected.
    #[error("DbLog: Could not connect to the database: {0}")]
    Connection(#[source] BackendError),

    /// One schema statement failed (usually because it already exists).
    #[error("DbLog: Query '{name}' failed - maybe exists already: {source}")]
    SchemaSetup {
        name: &'static str,
        #[source]
        source: BackendError,
    },

    /// Resolving, writing or committing one item failed.
    #[error("DbLog: problem updating {item}: {source}")]
    FlushItem {
        item: String,
        #[source]
        source: BackendError,
    },

    /// Closing the connection failed.
    #[error("DbLog: closing the connection failed: {0}")]
    Close(#[source] BackendError),

    #[error("DbLog: not connected")]
    NotConnected,
}
