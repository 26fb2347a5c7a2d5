// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the collector.

use crate::identifier::EngineId;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error::Error, fmt};
use thiserror::Error;

/// An error that occurred while handling a lifecycle callback or writing the report.
///
/// Errors never affect the test run itself: the collector is a passive observer, and engines are
/// expected to log these errors and carry on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    /// A lifecycle callback broke the engine's contract.
    #[error("test lifecycle invariant violated")]
    Invariant(#[from] InvariantViolation),

    /// The report could not be written.
    #[error("error writing test report")]
    Write(#[from] WriteReportError),
}

/// A lifecycle callback that broke the engine's contract: every test must be started exactly
/// once, then finished exactly once.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum InvariantViolation {
    /// A test finished without having been started.
    ///
    /// The tracker never synthesizes a record for such a test.
    #[error("test `{id}` finished, but it was never started")]
    FinishWithoutStart {
        /// The engine identifier of the test.
        id: EngineId,
    },

    /// A test was started while it was already running.
    #[error("test `{id}` started while it was already running")]
    AlreadyRunning {
        /// The engine identifier of the test.
        id: EngineId,
    },

    /// A test was started or finished after it had already completed.
    #[error("test `{id}` was already completed")]
    AlreadyCompleted {
        /// The engine identifier of the test.
        id: EngineId,
    },
}

/// An error that occurred while writing the JSON report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// The directory the report is written to could not be created.
    #[error("error creating report directory `{dir}`")]
    CreateDir {
        /// The directory being created.
        dir: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The report file could not be written.
    #[error("error writing report to `{path}`")]
    Write {
        /// The report file.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The absolute path of the written report could not be determined.
    #[error("error resolving absolute path of report `{path}`")]
    Canonicalize {
        /// The report file.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while parsing the collector's configuration.
#[derive(Debug, Error)]
#[error("failed to parse ktreport config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file that was being parsed.
    pub fn config_file(&self) -> &camino::Utf8Path {
        &self.config_file
    }
}

/// An error that occurred while parsing an [`EngineId`] from its text form.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("invalid engine identifier `{input}`: {reason}")]
pub struct EngineIdParseError {
    input: String,
    reason: &'static str,
}

impl EngineIdParseError {
    pub(crate) fn new(input: impl Into<String>, reason: &'static str) -> Self {
        Self {
            input: input.into(),
            reason,
        }
    }
}

/// The error attached to a test that panicked.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{message}")]
pub struct PanicError {
    message: String,
}

impl PanicError {
    /// Creates a new `PanicError` from a panic payload, as returned by
    /// [`std::panic::catch_unwind`].
    pub fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_owned()
        };
        Self { message }
    }

    /// Returns the panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Displays an error along with the chain of errors that caused it.
///
/// The output looks like:
///
/// ```text
/// error writing test report
///   caused by:
///   - error creating report directory `build/test-results`
///   - permission denied (os error 13)
/// ```
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let Some(mut cause) = self.error.source() else {
            return Ok(());
        };

        write!(f, "\n  caused by:")?;
        loop {
            // Indent continuation lines so that multi-line causes stay readable.
            let message = cause.to_string();
            let mut lines = message.lines();
            write!(f, "\n  - {}", lines.next().unwrap_or_default())?;
            for line in lines {
                write!(f, "\n    {line}")?;
            }

            match cause.source() {
                Some(next) => cause = next,
                None => break,
            }
        }

        Ok(())
    }
}

impl<E: fmt::Debug> fmt::Debug for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayErrorChain")
            .field("error", &self.error)
            .finish()
    }
}
