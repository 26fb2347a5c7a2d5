// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clocks used to timestamp lifecycle events.

mod clock;
mod stopwatch;

pub use clock::*;
