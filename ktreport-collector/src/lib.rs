// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Collects the results of a test run from a test engine's lifecycle callbacks, and writes them
//! out as a JSON report.
//!
//! The engine drives a [`ReportCollector`] through the [`TestExecutionListener`] trait. For each
//! test, the collector:
//!
//! 1. derives a [`UniqueId`](ktreport_metadata::UniqueId) and a
//!    [`SpecId`](ktreport_metadata::SpecId) from the engine's hierarchical [`EngineId`],
//! 2. captures whatever the test writes through [`test_output::stdout`] and
//!    [`test_output::stderr`] (or the [`kt_println!`] family of macros) while it runs,
//! 3. tracks the test from running to completed in a concurrent [`LifecycleTracker`].
//!
//! Once the suite finishes, completed tests are aggregated into a
//! [`TestSuiteResult`](ktreport_metadata::TestSuiteResult) and written to disk. The `ktreport`
//! binary reads the report back and prints a summary.

mod collector;
pub mod config;
pub mod errors;
pub mod identifier;
pub mod listener;
pub mod reporter;
pub mod test_output;
pub mod time;
pub mod tracker;

pub use collector::*;
pub use config::ReportConfig;
pub use identifier::{EngineId, TestIdentifier, TestSource};
pub use listener::{TestExecutionListener, TestExecutionResult};
pub use time::{Clock, ManualClock, MonotonicClock};
pub use tracker::LifecycleTracker;
