// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The interface between a test engine and the collector.

use crate::{errors::PanicError, errors::ReportError, identifier::TestIdentifier};
use ktreport_metadata::TestStatus;
use std::{any::Any, error::Error, fmt};

/// Receives lifecycle callbacks from a test engine.
///
/// Engines may call these methods from any number of threads at once. For a given test, though,
/// [`on_test_start`](Self::on_test_start) and [`on_test_finish`](Self::on_test_finish) must be
/// called on the thread that runs the test body, since that is the thread whose output is
/// captured.
///
/// Errors returned from these methods describe problems with reporting, not with the tests
/// themselves. Engines should log them and carry on running tests.
pub trait TestExecutionListener: Send + Sync {
    /// Called once, before any test starts.
    fn on_suite_start(&self) -> Result<(), ReportError> {
        Ok(())
    }

    /// Called once, after every test has finished.
    fn on_suite_finish(&self) -> Result<(), ReportError> {
        Ok(())
    }

    /// Called when a test or container starts executing.
    fn on_test_start(&self, identifier: &TestIdentifier) -> Result<(), ReportError> {
        let _ = identifier;
        Ok(())
    }

    /// Called when a test or container finishes executing, or is aborted.
    fn on_test_finish(
        &self,
        identifier: &TestIdentifier,
        result: &TestExecutionResult,
    ) -> Result<(), ReportError> {
        let _ = (identifier, result);
        Ok(())
    }
}

/// The result of executing a test, as reported by the engine.
pub struct TestExecutionResult {
    status: TestStatus,
    error: Option<Box<dyn Error + Send + Sync>>,
}

impl TestExecutionResult {
    /// The test passed.
    pub fn successful() -> Self {
        Self {
            status: TestStatus::Successful,
            error: None,
        }
    }

    /// The test failed with the given error.
    pub fn failed(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            status: TestStatus::Failed,
            error: Some(error.into()),
        }
    }

    /// The test failed without an error.
    pub fn failed_without_error() -> Self {
        Self {
            status: TestStatus::Failed,
            error: None,
        }
    }

    /// The test was aborted, optionally with the error that caused it.
    pub fn aborted(error: Option<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            status: TestStatus::Aborted,
            error,
        }
    }

    /// The test panicked with the given payload, as returned by [`std::panic::catch_unwind`].
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::failed(PanicError::from_payload(payload))
    }

    /// Returns the status of the test.
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Returns the error the test finished with, if any.
    pub fn error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.error.as_deref()
    }
}

impl fmt::Debug for TestExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestExecutionResult")
            .field("status", &self.status)
            .field("error", &self.error.as_ref().map(|error| error.to_string()))
            .finish()
    }
}
