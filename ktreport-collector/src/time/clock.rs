// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::stopwatch::{StopwatchStart, stopwatch};
use chrono::{DateTime, TimeDelta, Utc};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

/// A source of timestamps for lifecycle events.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// The default clock: the wall-clock time at construction, advanced by a monotonic timer.
///
/// Timestamps from this clock never go backwards, even if the system clock is adjusted while
/// tests are running.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    start: StopwatchStart,
}

impl MonotonicClock {
    /// Creates a new clock starting at the current wall-clock time.
    pub fn new() -> Self {
        Self { start: stopwatch() }
    }

    /// Returns the wall-clock time at which this clock was created.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.start_time()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        self.start.snapshot().end_time()
    }
}

/// A clock that only moves when told to, with millisecond resolution.
///
/// Useful for replaying recorded events, and for tests.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a new clock stopped at the given time.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Moves the clock forward by the given number of milliseconds.
    pub fn advance_ms(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Sets the clock to the given time. This may move the clock backwards.
    pub fn set(&self, time: DateTime<Utc>) {
        self.millis.store(time.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::milliseconds(millis)
    }
}
