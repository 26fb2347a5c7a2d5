// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::WriteReportError;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use ktreport_metadata::TestSuiteResult;
use std::{fmt, io::Write};
use tracing::debug;

/// Writes a [`TestSuiteResult`] to disk as JSON.
#[derive(Clone, Debug)]
pub struct JsonReportWriter {
    path: Utf8PathBuf,
    pretty: bool,
}

impl JsonReportWriter {
    /// Creates a new writer for the given path.
    pub fn new(path: impl Into<Utf8PathBuf>, pretty: bool) -> Self {
        Self {
            path: path.into(),
            pretty,
        }
    }

    /// Returns the path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Writes the report, creating parent directories as needed.
    ///
    /// The report is written to a temporary file in the same directory and then renamed into
    /// place, so a reader never observes a partially written report.
    pub fn write(&self, suite: &TestSuiteResult) -> Result<WrittenReport, WriteReportError> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| WriteReportError::CreateDir {
                dir: dir.to_owned(),
                error,
            })?;
        }

        let file = AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite);
        file.write(|f| {
            if self.pretty {
                serde_json::to_writer_pretty(&mut *f, suite)?;
            } else {
                serde_json::to_writer(&mut *f, suite)?;
            }
            f.write_all(b"\n")
        })
        .map_err(|err| WriteReportError::Write {
            path: self.path.clone(),
            error: match err {
                atomicwrites::Error::Internal(err) => err,
                atomicwrites::Error::User(err) => err,
            },
        })?;

        let path =
            self.path
                .canonicalize_utf8()
                .map_err(|error| WriteReportError::Canonicalize {
                    path: self.path.clone(),
                    error,
                })?;
        debug!(%path, total_tests = suite.total_tests, "wrote test report");

        Ok(WrittenReport { path })
    }
}

/// A report that has been written to disk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WrittenReport {
    path: Utf8PathBuf,
}

impl WrittenReport {
    /// Returns the absolute path of the report.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the line announcing where the report was written.
    pub fn confirmation_line(&self) -> ConfirmationLine<'_> {
        ConfirmationLine { path: &self.path }
    }
}

/// Displays the line announcing where a report was written.
#[derive(Clone, Copy, Debug)]
pub struct ConfirmationLine<'a> {
    path: &'a Utf8Path,
}

impl fmt::Display for ConfirmationLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ktreport] Test results have been written to: {}", self.path)
    }
}
