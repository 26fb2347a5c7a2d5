// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use ktreport_metadata::{TestResultSummary, TestStatus, TestSuiteResult};
use tracing::warn;

/// Aggregates completed test results into a suite result.
///
/// Results are sorted by unique ID. Successful tests are counted as passed, failed tests as
/// failed, and aborted tests as skipped.
pub fn aggregate(
    mut results: Vec<TestResultSummary>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> TestSuiteResult {
    results.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));

    let (mut passed, mut failed, mut skipped) = (0, 0, 0);
    for result in &results {
        match result.status {
            TestStatus::Successful => passed += 1,
            TestStatus::Failed => failed += 1,
            TestStatus::Aborted => skipped += 1,
        }
    }

    let elapsed_ms = end_time.signed_duration_since(start_time).num_milliseconds();
    let total_duration_ms = u64::try_from(elapsed_ms).unwrap_or_else(|_| {
        warn!(elapsed_ms, "test suite finished before it started, recording 0ms");
        0
    });

    TestSuiteResult {
        total_tests: results.len(),
        test_results: results,
        passed,
        failed,
        skipped,
        start_time,
        end_time,
        total_duration_ms,
    }
}
