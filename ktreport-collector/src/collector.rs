// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The collector: ties identifier derivation, output capture and lifecycle tracking together,
//! and writes the report once the suite finishes.

use crate::{
    config::ReportConfig,
    errors::{DisplayErrorChain, ReportError},
    identifier::TestIdentifier,
    listener::{TestExecutionListener, TestExecutionResult},
    reporter::{JsonReportWriter, WrittenReport, aggregate},
    test_output::{self, CapturedOutput},
    time::{Clock, MonotonicClock},
    tracker::{LifecycleTracker, TestOutcome},
};
use chrono::{DateTime, Utc};
use ktreport_metadata::TestSuiteResult;
use std::{error::Error, io::Write, sync::OnceLock};
use tracing::{debug, warn};

/// Collects test results reported by an engine, and writes them out as a JSON report once the
/// suite finishes.
///
/// A single collector is shared by reference across every thread the engine runs tests on.
///
/// Only nodes that are executed as tests are recorded. Callbacks for pure containers, such as
/// classes, are accepted and ignored.
///
/// # Examples
///
/// ```
/// use ktreport_collector::{
///     EngineId, ReportCollector, ReportConfig, TestExecutionListener,
///     TestExecutionResult, TestIdentifier, kt_println,
/// };
///
/// # let dir = camino_tempfile::tempdir().unwrap();
/// let mut config = ReportConfig::default_config(dir.path());
/// config.set_print_confirmation(false);
/// let collector = ReportCollector::new(&config);
///
/// let id = EngineId::for_engine("junit-jupiter")
///     .append("class", "pkg.A")
///     .append("method", "add()");
/// let test = TestIdentifier::test(id, "add()");
///
/// collector.on_suite_start().unwrap();
/// collector.on_test_start(&test).unwrap();
/// kt_println!("hello");
/// collector.on_test_finish(&test, &TestExecutionResult::successful()).unwrap();
///
/// let finished = collector.finish_suite().unwrap();
/// assert_eq!(finished.suite().passed, 1);
/// assert_eq!(finished.suite().test_results[0].stdout, "hello\n");
/// ```
#[derive(Debug)]
pub struct ReportCollector {
    tracker: LifecycleTracker,
    clock: Box<dyn Clock>,
    created_at: DateTime<Utc>,
    suite_start: OnceLock<DateTime<Utc>>,
    suite_end: OnceLock<DateTime<Utc>>,
    writer: JsonReportWriter,
    print_confirmation: bool,
}

impl ReportCollector {
    /// Creates a new collector using the system clock.
    pub fn new(config: &ReportConfig) -> Self {
        Self::with_clock(config, MonotonicClock::new())
    }

    /// Creates a new collector that reads timestamps from the given clock.
    pub fn with_clock(config: &ReportConfig, clock: impl Clock + 'static) -> Self {
        let created_at = clock.now();
        Self {
            tracker: LifecycleTracker::new(),
            clock: Box::new(clock),
            created_at,
            suite_start: OnceLock::new(),
            suite_end: OnceLock::new(),
            writer: JsonReportWriter::new(config.path(), config.pretty()),
            print_confirmation: config.print_confirmation(),
        }
    }

    /// Returns the lifecycle tracker.
    pub fn tracker(&self) -> &LifecycleTracker {
        &self.tracker
    }

    /// Returns the path the report will be written to.
    pub fn report_path(&self) -> &camino::Utf8Path {
        self.writer.path()
    }

    /// Records the end of the suite, aggregates completed tests and writes the report.
    ///
    /// Tests that were started but never finished are left out of the report.
    pub fn finish_suite(&self) -> Result<FinishedReport, ReportError> {
        let end_time = self.record_once(&self.suite_end, "finish");
        // A suite that never started is treated as having started when the collector was
        // created.
        let start_time = self.suite_start.get().copied().unwrap_or_else(|| {
            warn!("test suite finished without having been started");
            self.created_at
        });

        let suite = aggregate(self.tracker.completed(), start_time, end_time);
        let written = self.writer.write(&suite)?;

        if self.print_confirmation {
            // Written to the real stdout even if the finishing thread is capturing.
            let mut stdout = std::io::stdout().lock();
            if let Err(error) = writeln!(stdout, "{}", written.confirmation_line()) {
                warn!(
                    "failed to print report confirmation: {}",
                    DisplayErrorChain::new(error)
                );
            }
        }

        Ok(FinishedReport { suite, written })
    }

    fn record_once(&self, cell: &OnceLock<DateTime<Utc>>, event: &str) -> DateTime<Utc> {
        let now = self.clock.now();
        match cell.set(now) {
            Ok(()) => now,
            Err(_) => {
                let recorded = cell.get().copied().unwrap_or(now);
                warn!(
                    "test suite {event} reported more than once, \
                     keeping the first timestamp ({recorded})"
                );
                recorded
            }
        }
    }
}

impl TestExecutionListener for ReportCollector {
    fn on_suite_start(&self) -> Result<(), ReportError> {
        let start_time = self.record_once(&self.suite_start, "start");
        debug!(%start_time, "test suite started");
        Ok(())
    }

    fn on_suite_finish(&self) -> Result<(), ReportError> {
        self.finish_suite().map(|_| ())
    }

    fn on_test_start(&self, identifier: &TestIdentifier) -> Result<(), ReportError> {
        if !identifier.is_test() {
            return Ok(());
        }

        self.tracker.start(identifier, self.clock.now())?;
        test_output::install();
        Ok(())
    }

    fn on_test_finish(
        &self,
        identifier: &TestIdentifier,
        result: &TestExecutionResult,
    ) -> Result<(), ReportError> {
        if !identifier.is_test() {
            return Ok(());
        }

        // Check before draining, so a stray finish doesn't take another test's capture.
        self.tracker.ensure_running(identifier.id())?;
        let output = test_output::drain().unwrap_or_else(|| {
            warn!(
                id = %identifier.id(),
                "no output capture installed on this thread, \
                 was the test finished on a different thread than it was started on?",
            );
            CapturedOutput::default()
        });

        let outcome = TestOutcome::new(result.status())
            .with_output(&output)
            .with_error(result.error().map(|error| error as &(dyn Error + 'static)));
        self.tracker
            .finish(identifier.id(), outcome, self.clock.now())?;
        Ok(())
    }
}

/// The result of [`ReportCollector::finish_suite`].
#[derive(Clone, Debug)]
pub struct FinishedReport {
    suite: TestSuiteResult,
    written: WrittenReport,
}

impl FinishedReport {
    /// Returns the aggregated suite result.
    pub fn suite(&self) -> &TestSuiteResult {
        &self.suite
    }

    /// Returns information about the written report.
    pub fn written(&self) -> &WrittenReport {
        &self.written
    }
}
