// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the report written by `ktreport-collector`.
//!
//! The collector serializes a [`TestSuiteResult`] to JSON once a test plan finishes executing.
//! This crate contains the data model for that file, so that other tools (including the
//! `ktreport` console summary) can read it back without depending on the collector itself.

mod errors;
mod exit_codes;
mod report;

pub use errors::*;
pub use exit_codes::*;
pub use report::*;
