// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `ktreport` failures.
///
/// `ktreport` may fail for a variety of reasons. This structure documents the exit codes that may
/// occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum KtreportExitCode {}

impl KtreportExitCode {
    /// No errors occurred, and every test in the report passed.
    pub const OK: i32 = 0;

    /// One or more tests in the report failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// A user issue happened while setting up a `ktreport` invocation: for example, the report
    /// could not be read, or the configuration was invalid.
    pub const SETUP_ERROR: i32 = 96;
}
