// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregates completed tests into a suite result, and writes it out as a JSON report.

mod aggregator;
mod json;

pub use aggregator::*;
pub use json::*;
