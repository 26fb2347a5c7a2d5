// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use camino_tempfile::Utf8TempDir;
use chrono::{DateTime, Utc};
use ktreport_collector::{
    EngineId, ManualClock, ReportCollector, ReportConfig, TestIdentifier, TestSource,
};
use std::sync::Arc;

/// The time at which every fixture clock starts.
pub(crate) const START_MILLIS: i64 = 1_700_000_000_000;

pub(crate) fn at(offset_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(START_MILLIS + offset_ms).expect("valid timestamp")
}

/// A collector writing to a scratch directory, driven by a manual clock.
pub(crate) struct CollectorFixture {
    // Held so the directory outlives the collector.
    _dir: Utf8TempDir,
    pub(crate) report_path: Utf8PathBuf,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) collector: ReportCollector,
}

impl CollectorFixture {
    pub(crate) fn new() -> Self {
        let dir = camino_tempfile::Builder::new()
            .prefix("ktreport-collector-")
            .tempdir()
            .expect("temp dir created");
        let mut config = ReportConfig::default_config(dir.path());
        config.set_print_confirmation(false);
        let report_path = config.path().to_owned();

        let clock = Arc::new(ManualClock::new(at(0)));
        let collector = ReportCollector::with_clock(&config, clock.clone());
        Self {
            _dir: dir,
            report_path,
            clock,
            collector,
        }
    }
}

/// The engine identifier of a test method in a class, as JUnit Jupiter reports it.
pub(crate) fn method_id(class: &str, method: &str) -> EngineId {
    EngineId::for_engine("junit-jupiter")
        .append("class", class)
        .append("method", method)
}

pub(crate) fn method_test(class: &str, method: &str) -> TestIdentifier {
    TestIdentifier::test(method_id(class, method), method).with_source(TestSource::Method {
        class_name: class.to_owned(),
        method_name: method.trim_end_matches("()").to_owned(),
        method_parameter_types: String::new(),
    })
}
