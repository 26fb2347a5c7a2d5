// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving the collector the way a test engine does.

mod fixtures;
mod lifecycle;
mod report;
