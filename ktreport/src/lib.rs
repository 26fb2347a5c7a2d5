// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints a console summary of a test run recorded by
//! [ktreport-collector](https://docs.rs/ktreport-collector).
//!
//! The summary lists each specification with one `.` or `F` per test, the details of every
//! failed test (with long stack traces trimmed), and a final pass/fail line. The exit code is
//! nonzero if any test failed, so `ktreport` can gate CI jobs.

#![warn(missing_docs)]

mod dispatch;
mod display;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
