// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracks the lifecycle of every test in a run.
//!
//! Each test moves through exactly two states: it is [`Running`](TestResult::Running) from the
//! moment the engine reports it as started, and becomes [`Completed`](TestResult::Completed) when
//! the engine reports it as finished. Aborted tests complete like any other, carrying the aborted
//! status.
//!
//! The tracker is shared by every thread the engine runs tests on. Records are stored in a
//! sharded map, so callbacks for different tests don't contend on a single lock.

use crate::{
    errors::{DisplayErrorChain, InvariantViolation},
    identifier::{EngineId, TestIdentifier},
    test_output::CapturedOutput,
};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use ktreport_metadata::{SpecId, TestIdentifierInfo, TestResultSummary, TestStatus, UniqueId};
use std::error::Error;
use tracing::{debug, warn};

/// The state of a single test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestResult {
    /// The test has started, but not finished.
    Running(RunningTest),

    /// The test has finished.
    Completed(TestResultSummary),
}

impl TestResult {
    /// Returns the unique ID of the test.
    pub fn unique_id(&self) -> &UniqueId {
        match self {
            Self::Running(running) => &running.unique_id,
            Self::Completed(completed) => &completed.unique_id,
        }
    }

    /// Returns the spec ID of the test.
    pub fn spec_id(&self) -> &SpecId {
        match self {
            Self::Running(running) => &running.spec_id,
            Self::Completed(completed) => &completed.spec_id,
        }
    }

    /// Returns the time at which the test started.
    pub fn start_time(&self) -> DateTime<Utc> {
        match self {
            Self::Running(running) => running.start_time,
            Self::Completed(completed) => completed.start_time,
        }
    }
}

/// A test that has started, but not finished.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunningTest {
    /// The specification the test belongs to.
    pub spec_id: SpecId,

    /// The ID of this invocation.
    pub unique_id: UniqueId,

    /// Descriptive information about the test.
    pub identifier: TestIdentifierInfo,

    /// The time at which the test started.
    pub start_time: DateTime<Utc>,
}

impl RunningTest {
    /// Creates a running record for the given test, started at `start_time`.
    pub fn new(identifier: &TestIdentifier, start_time: DateTime<Utc>) -> Self {
        Self {
            spec_id: identifier.id().spec_id(),
            unique_id: identifier.id().unique_id(),
            identifier: identifier.to_info(),
            start_time,
        }
    }

    /// Completes this test at `end_time`.
    ///
    /// The duration is measured from the start time in whole milliseconds. If `end_time` is
    /// before the start time, the duration is zero.
    pub fn complete(self, outcome: TestOutcome, end_time: DateTime<Utc>) -> TestResultSummary {
        let elapsed_ms = end_time
            .signed_duration_since(self.start_time)
            .num_milliseconds();
        let duration_ms = u64::try_from(elapsed_ms).unwrap_or_else(|_| {
            warn!(
                unique_id = %self.unique_id,
                elapsed_ms,
                "test finished before it started (did the clock go backwards?), \
                 recording a duration of 0ms",
            );
            0
        });

        TestResultSummary {
            spec_id: self.spec_id,
            unique_id: self.unique_id,
            identifier: self.identifier,
            status: outcome.status,
            start_time: self.start_time,
            duration_ms,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            throwable: outcome.throwable,
        }
    }
}

/// What the engine reported when a test finished, along with the output captured while it ran.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestOutcome {
    /// The final status of the test.
    pub status: TestStatus,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,

    /// The rendered error the test finished with, if any.
    pub throwable: Option<String>,
}

impl TestOutcome {
    /// Creates a new outcome with the given status, no output and no error.
    pub fn new(status: TestStatus) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
            throwable: None,
        }
    }

    /// Sets the captured output.
    pub fn with_output(mut self, output: &CapturedOutput) -> Self {
        self.stdout = output.stdout_lossy();
        self.stderr = output.stderr_lossy();
        self
    }

    /// Renders the given error, along with its chain of causes, as the test's throwable.
    pub fn with_error(mut self, error: Option<&(dyn Error + 'static)>) -> Self {
        self.throwable = error.map(|error| DisplayErrorChain::new(error).to_string());
        self
    }
}

/// A concurrent map from each test to its [`TestResult`].
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    results: DashMap<EngineId, TestResult>,
}

impl LifecycleTracker {
    /// Creates a new, empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a test started at `now`.
    ///
    /// Returns an error if the test was already started.
    pub fn start(
        &self,
        identifier: &TestIdentifier,
        now: DateTime<Utc>,
    ) -> Result<(), InvariantViolation> {
        match self.results.entry(identifier.id().clone()) {
            Entry::Vacant(entry) => {
                let running = RunningTest::new(identifier, now);
                debug!(unique_id = %running.unique_id, "test started");
                entry.insert(TestResult::Running(running));
                Ok(())
            }
            Entry::Occupied(entry) => {
                let id = identifier.id().clone();
                match entry.get() {
                    TestResult::Running(_) => Err(InvariantViolation::AlreadyRunning { id }),
                    TestResult::Completed(_) => Err(InvariantViolation::AlreadyCompleted { id }),
                }
            }
        }
    }

    /// Returns an error unless the test is currently running.
    pub fn ensure_running(&self, id: &EngineId) -> Result<(), InvariantViolation> {
        match self.results.get(id).as_deref() {
            Some(TestResult::Running(_)) => Ok(()),
            Some(TestResult::Completed(_)) => {
                Err(InvariantViolation::AlreadyCompleted { id: id.clone() })
            }
            None => Err(InvariantViolation::FinishWithoutStart { id: id.clone() }),
        }
    }

    /// Records that a running test finished at `now`, replacing its record with a completed one.
    ///
    /// Returns an error if the test is not running. A record is never synthesized for a test that
    /// wasn't started.
    pub fn finish(
        &self,
        id: &EngineId,
        outcome: TestOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), InvariantViolation> {
        let mut entry = self
            .results
            .get_mut(id)
            .ok_or_else(|| InvariantViolation::FinishWithoutStart { id: id.clone() })?;

        let running = match &*entry {
            TestResult::Running(running) => running.clone(),
            TestResult::Completed(_) => {
                return Err(InvariantViolation::AlreadyCompleted { id: id.clone() });
            }
        };

        let completed = running.complete(outcome, now);
        debug!(
            unique_id = %completed.unique_id,
            status = %completed.status,
            duration_ms = completed.duration_ms,
            "test finished",
        );
        *entry = TestResult::Completed(completed);
        Ok(())
    }

    /// Returns a copy of the current record for a test.
    pub fn get(&self, id: &EngineId) -> Option<TestResult> {
        self.results.get(id).map(|entry| entry.value().clone())
    }

    /// Returns the number of tests tracked, in either state.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if no tests have been started.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns every completed record, in no particular order.
    ///
    /// Tests that are still running are left out: the engine never finished them, so there is
    /// nothing meaningful to report.
    pub fn completed(&self) -> Vec<TestResultSummary> {
        let mut completed = Vec::with_capacity(self.results.len());
        let mut still_running = 0_usize;
        for entry in self.results.iter() {
            match entry.value() {
                TestResult::Completed(summary) => completed.push(summary.clone()),
                TestResult::Running(running) => {
                    debug!(unique_id = %running.unique_id, "test never finished");
                    still_running += 1;
                }
            }
        }

        if still_running > 0 {
            warn!(
                "{still_running} {} started but never finished, and will be left out of the report",
                if still_running == 1 { "test" } else { "tests" },
            );
        }
        completed
    }
}
