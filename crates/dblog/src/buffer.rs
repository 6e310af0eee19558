// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-item buffer of pending observations.
//!
//! Producers append from any thread; the flusher drains one item at a time.
//! Both sides take the same short-held lock, so a drain either sees an
//! appended observation or leaves it for the next cycle, never both.

use crate::sample::Observation;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Pending observations keyed by item identifier.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    items: Mutex<BTreeMap<String, Vec<Observation>>>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue for `item`.
    ///
    /// Returns false if the item was already known.
    pub fn register(&self, item: &str) -> bool {
        let mut items = self.items.lock();
        if items.contains_key(item) {
            return false;
        }
        items.insert(item.to_string(), Vec::new());
        true
    }

    /// Queue an observation, registering the item on first sight.
    pub fn append(&self, item: &str, observation: Observation) {
        let mut items = self.items.lock();
        match items.get_mut(item) {
            Some(queue) => queue.push(observation),
            None => {
                items.insert(item.to_string(), vec![observation]);
            }
        }
    }

    /// Take every pending observation for `item`, leaving an empty queue.
    pub fn drain(&self, item: &str) -> Vec<Observation> {
        self.items
            .lock()
            .get_mut(item)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Known item identifiers, in order.
    pub fn items(&self) -> Vec<String> {
        self.items.lock().keys().cloned().collect()
    }

    /// Pending observations for one item.
    pub fn pending(&self, item: &str) -> usize {
        self.items.lock().get(item).map_or(0, Vec::len)
    }

    /// Pending observations across all items.
    pub fn total_pending(&self) -> usize {
        self.items.lock().values().map(Vec::len).sum()
    }
}
