// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host time source and epoch-millisecond conversion.

use chrono::{DateTime, Local, TimeZone};
use parking_lot::RwLock;
use std::time::{Duration, SystemTime};

/// Source of the current host time.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<SystemTime>,
}

impl MockClock {
    pub fn with_time(time: SystemTime) -> Self {
        Self {
            now: RwLock::new(time),
        }
    }

    pub fn new() -> Self {
        Self::with_time(SystemTime::now())
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.write();
        *now += duration;
    }

    pub fn set_time(&self, time: SystemTime) {
        *self.now.write() = time;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        *self.now.read()
    }
}

/// Whole epoch seconds times 1000 plus the millisecond fraction.
pub fn timestamp_ms<Tz: TimeZone>(dt: &DateTime<Tz>) -> i64 {
    dt.timestamp() * 1000 + i64::from(dt.timestamp_subsec_millis())
}

/// Inverse of [`timestamp_ms`], in the host's local time zone.
pub fn datetime_from_ms(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single()
}

/// Current time of `clock` as epoch milliseconds.
pub fn now_ms(clock: &dyn Clock) -> i64 {
    timestamp_ms(&DateTime::<Local>::from(clock.now()))
}
