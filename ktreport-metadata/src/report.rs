// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ReportParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{collections::BTreeSet, fmt, io, time::Duration};

/// Identifies a single concrete test invocation within a run.
///
/// Formed by joining the values of an engine identifier's segments with `/`, leaving out the
/// engine segment. Unique IDs are expected to be unique within a run, and reports are ordered by
/// them.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(SmolStr);

impl UniqueId {
    /// Creates a new `UniqueId`.
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Groups test invocations under the specification (class, nested class, or file) that encloses
/// them.
///
/// Unlike [`UniqueId`], several invocations may share a `SpecId`: every method of a class, and
/// every invocation of a parameterized test, map to the same one.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecId(SmolStr);

impl SpecId {
    /// Creates a new `SpecId`.
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this ID is empty, i.e. every segment it was derived from was excluded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The final status of a test, as reported by the test engine.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    /// The test passed.
    Successful,

    /// The test failed.
    Failed,

    /// The test was aborted, for example because an assumption did not hold.
    ///
    /// Aborted tests are counted as skipped.
    Aborted,
}

impl TestStatus {
    /// Returns the serialized name of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Successful => "SUCCESSFUL",
            Self::Failed => "FAILED",
            Self::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of node in the engine's test tree.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestType {
    /// A node that only contains other nodes, such as a class.
    Container,

    /// A node that is executed as a test.
    Test,

    /// A node that is executed as a test, and may also dynamically register children.
    ContainerAndTest,
}

impl TestType {
    /// Returns true if nodes of this type are executed as tests.
    pub fn is_test(self) -> bool {
        matches!(self, Self::Test | Self::ContainerAndTest)
    }

    /// Returns the serialized name of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Container => "CONTAINER",
            Self::Test => "TEST",
            Self::ContainerAndTest => "CONTAINER_AND_TEST",
        }
    }
}

/// Descriptive information about the test, as stored in the report.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestIdentifierInfo {
    /// The human-readable name of the test.
    pub display_name: String,

    /// The kind of node this is.
    #[serde(rename = "type")]
    pub test_type: TestType,

    /// The tags attached to the test. Serialized in sorted order.
    pub tags: BTreeSet<String>,

    /// A short name for where the test was defined, e.g. a method or class name.
    #[serde(default)]
    pub test_source_name: Option<String>,

    /// A full description of where the test was defined.
    #[serde(default)]
    pub test_source_full: Option<String>,
}

/// The result of a single completed test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultSummary {
    /// The specification this test belongs to.
    pub spec_id: SpecId,

    /// The ID of this test invocation.
    pub unique_id: UniqueId,

    /// Descriptive information about the test.
    pub identifier: TestIdentifierInfo,

    /// The final status of the test.
    pub status: TestStatus,

    /// The time at which the test started, serialized as milliseconds since the Unix epoch.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,

    /// How long the test took, in milliseconds.
    pub duration_ms: u64,

    /// Standard output captured while the test was running.
    #[serde(default)]
    pub stdout: String,

    /// Standard error captured while the test was running.
    #[serde(default)]
    pub stderr: String,

    /// The rendered error the test finished with, if any.
    #[serde(default)]
    pub throwable: Option<String>,
}

impl TestResultSummary {
    /// Returns true if this test should be displayed as a failure.
    ///
    /// A test is a failure if it failed, or if it finished with an error attached (which can
    /// happen for aborted tests).
    pub fn is_failure(&self) -> bool {
        self.status == TestStatus::Failed || self.throwable.is_some()
    }

    /// Returns how long the test took.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// The aggregate result of a test plan execution: the root object of the report.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteResult {
    /// The results of every completed test, ordered by [`UniqueId`].
    pub test_results: Vec<TestResultSummary>,

    /// The number of completed tests.
    pub total_tests: usize,

    /// The number of tests that were successful.
    pub passed: usize,

    /// The number of tests that failed.
    pub failed: usize,

    /// The number of tests that were aborted.
    pub skipped: usize,

    /// The time at which the test plan started executing.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,

    /// The time at which the test plan finished executing.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,

    /// The total time taken by the test plan, in milliseconds.
    pub total_duration_ms: u64,
}

impl TestSuiteResult {
    /// Parses a report from a JSON string.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, ReportParseError> {
        serde_json::from_str(json.as_ref()).map_err(ReportParseError::Json)
    }

    /// Reads a report from the given reader.
    pub fn from_reader(reader: impl io::Read) -> Result<Self, ReportParseError> {
        serde_json::from_reader(io::BufReader::new(reader)).map_err(|err| {
            if err.is_io() {
                ReportParseError::Io(err.into())
            } else {
                ReportParseError::Json(err)
            }
        })
    }

    /// Returns true if no test in the report failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Returns the total time taken by the test plan.
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.total_duration_ms)
    }

    /// Iterates over the tests that should be displayed as failures, in report order.
    pub fn failures(&self) -> impl Iterator<Item = &TestResultSummary> + '_ {
        self.test_results.iter().filter(|result| result.is_failure())
    }
}
