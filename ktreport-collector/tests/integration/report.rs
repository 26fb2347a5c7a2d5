// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use indoc::indoc;
use ktreport_collector::{
    ManualClock, ReportCollector, ReportConfig, TestExecutionListener, TestExecutionResult,
    errors::{ReportError, WriteReportError},
};
use ktreport_metadata::TestSuiteResult;
use pretty_assertions::assert_eq;
use test_strategy::proptest;

#[test]
fn report_on_disk_matches_suite() -> Result<()> {
    let fixture = CollectorFixture::new();
    let collector = &fixture.collector;

    collector.on_suite_start()?;
    for method in ["zeta()", "alpha()", "mid()"] {
        let test = method_test("pkg.A", method).with_tags(["fast"]);
        collector.on_test_start(&test)?;
        fixture.clock.advance_ms(10);
        collector.on_test_finish(&test, &TestExecutionResult::successful())?;
    }
    let finished = collector.finish_suite()?;

    assert_eq!(
        finished.written().path(),
        fixture.report_path.canonicalize_utf8()?
    );
    let contents = std::fs::read_to_string(&fixture.report_path)?;
    let parsed = TestSuiteResult::parse_json(&contents)?;
    assert_eq!(&parsed, finished.suite());

    let ids: Vec<_> = parsed
        .test_results
        .iter()
        .map(|result| result.unique_id.as_str())
        .collect();
    assert_eq!(ids, ["pkg.A/alpha()", "pkg.A/mid()", "pkg.A/zeta()"]);
    assert_eq!(parsed.start_time, at(0));
    assert_eq!(parsed.end_time, at(30));
    assert_eq!(parsed.total_duration_ms, 30);

    let value: serde_json::Value = serde_json::from_str(&contents)?;
    assert_eq!(value["startTime"], serde_json::json!(START_MILLIS));
    assert_eq!(value["testResults"][0]["status"], "SUCCESSFUL");
    assert_eq!(value["testResults"][0]["identifier"]["type"], "TEST");
    assert_eq!(
        value["testResults"][0]["identifier"]["tags"],
        serde_json::json!(["fast"])
    );
    assert_eq!(value["testResults"][0]["throwable"], serde_json::Value::Null);

    Ok(())
}

#[test]
fn repo_config_controls_output() -> Result<()> {
    let dir = camino_tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join(".config"))?;
    std::fs::write(
        dir.path().join(ReportConfig::CONFIG_PATH),
        indoc! {r#"
            [report]
            path = "out/results.json"
            pretty = false
            print-confirmation = false
        "#},
    )?;

    let config = ReportConfig::from_sources(dir.path(), None)?;
    let collector = ReportCollector::with_clock(&config, ManualClock::new(at(0)));
    collector.on_suite_start()?;
    collector.finish_suite()?;

    let contents = std::fs::read_to_string(dir.path().join("out/results.json"))?;
    assert_eq!(contents.lines().count(), 1, "report is compact: {contents}");

    Ok(())
}

#[test]
fn unwritable_report_directory() -> Result<()> {
    let dir = camino_tempfile::tempdir()?;
    let blocker = dir.path().join("build");
    std::fs::write(&blocker, "not a directory")?;

    let mut config = ReportConfig::default_config(dir.path());
    config.set_print_confirmation(false);
    let collector = ReportCollector::with_clock(&config, ManualClock::new(at(0)));
    collector.on_suite_start()?;

    let err = collector
        .on_suite_finish()
        .expect_err("report directory can't be created");
    let ReportError::Write(WriteReportError::CreateDir { dir: failed_dir, .. }) = &err else {
        panic!("expected a directory creation error, got {err:?}");
    };
    assert_eq!(*failed_dir, blocker.join("test-results"));

    Ok(())
}

#[proptest(cases = 32)]
fn written_report_preserves_counts_and_order(
    #[strategy(proptest::collection::vec((0u8..3, 0i64..50), 0..12))] tests: Vec<(u8, i64)>,
) {
    let fixture = CollectorFixture::new();
    let collector = &fixture.collector;

    collector.on_suite_start().expect("suite started");
    for (i, (status, duration)) in tests.iter().enumerate() {
        let test = method_test("pkg.A", &format!("t{}()", tests.len() - i));
        let result = match status {
            0 => TestExecutionResult::successful(),
            1 => TestExecutionResult::failed("assertion failed"),
            _ => TestExecutionResult::aborted(None),
        };
        collector.on_test_start(&test).expect("test started");
        fixture.clock.advance_ms(*duration);
        collector
            .on_test_finish(&test, &result)
            .expect("test finished");
    }
    let finished = collector.finish_suite().expect("report written");

    let contents = std::fs::read_to_string(&fixture.report_path).expect("report readable");
    let parsed = TestSuiteResult::parse_json(&contents).expect("report parses");
    assert_eq!(parsed.total_tests, tests.len());
    assert_eq!(
        parsed.total_tests,
        parsed.passed + parsed.failed + parsed.skipped
    );
    assert_eq!(parsed.total_tests, finished.suite().total_tests);
    assert_eq!(
        parsed
            .test_results
            .iter()
            .map(|result| &result.unique_id)
            .collect::<Vec<_>>(),
        finished
            .suite()
            .test_results
            .iter()
            .map(|result| &result.unique_id)
            .collect::<Vec<_>>(),
    );
    assert!(
        parsed
            .test_results
            .windows(2)
            .all(|pair| pair[0].unique_id < pair[1].unique_id)
    );
}
