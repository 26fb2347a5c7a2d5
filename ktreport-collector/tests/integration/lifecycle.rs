// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use ktreport_collector::{
    TestExecutionListener, TestExecutionResult, TestIdentifier,
    errors::{InvariantViolation, ReportError},
    kt_eprintln, kt_print,
};
use ktreport_metadata::TestStatus;
use pretty_assertions::assert_eq;
use std::sync::Barrier;

#[test]
fn two_passing_tests() -> Result<()> {
    let fixture = CollectorFixture::new();
    let collector = &fixture.collector;
    let add = method_test("pkg/A", "add");
    let subtract = method_test("pkg/A", "subtract");

    collector.on_suite_start()?;
    collector.on_test_start(&add)?;
    fixture.clock.advance_ms(1);
    collector.on_test_start(&subtract)?;
    fixture.clock.advance_ms(4);
    collector.on_test_finish(&add, &TestExecutionResult::successful())?;
    fixture.clock.advance_ms(3);
    collector.on_test_finish(&subtract, &TestExecutionResult::successful())?;

    let finished = collector.finish_suite()?;
    let suite = finished.suite();
    assert_eq!(suite.total_tests, 2);
    assert_eq!(suite.passed, 2);
    assert_eq!(suite.failed, 0);
    assert_eq!(suite.skipped, 0);
    ensure!(
        suite.total_duration_ms >= 8,
        "total duration {} is at least 8ms",
        suite.total_duration_ms
    );

    let durations: Vec<_> = suite
        .test_results
        .iter()
        .map(|result| (result.unique_id.as_str(), result.duration_ms))
        .collect();
    assert_eq!(durations, [("pkg/A/add", 5), ("pkg/A/subtract", 7)]);
    assert_eq!(suite.test_results[0].spec_id.as_str(), "pkg/A");
    assert_eq!(suite.test_results[0].start_time, at(0));
    assert_eq!(suite.test_results[1].start_time, at(1));

    let identifier = &suite.test_results[0].identifier;
    assert_eq!(identifier.display_name, "add");
    assert_eq!(identifier.test_source_name.as_deref(), Some("add"));
    assert_eq!(
        identifier.test_source_full.as_deref(),
        Some("MethodSource [className = 'pkg/A', methodName = 'add', methodParameterTypes = '']")
    );

    Ok(())
}

#[test]
fn concurrent_output_is_attributed_to_its_test() -> Result<()> {
    let fixture = CollectorFixture::new();
    let collector = &fixture.collector;
    let hello = method_test("pkg.A", "hello()");
    let world = method_test("pkg.B", "world()");
    let barrier = Barrier::new(2);

    let run = |identifier: &TestIdentifier, text: &'static str| -> Result<(), ReportError> {
        collector.on_test_start(identifier)?;
        // Both tests are running before either writes anything.
        barrier.wait();
        kt_print!("{text}");
        barrier.wait();
        collector.on_test_finish(identifier, &TestExecutionResult::successful())
    };
    let run = &run;

    collector.on_suite_start()?;
    std::thread::scope(|s| -> Result<()> {
        let first = s.spawn(move || run(&hello, "hello"));
        let second = s.spawn(move || run(&world, "world"));
        first.join().expect("thread did not panic")?;
        second.join().expect("thread did not panic")?;
        Ok(())
    })?;

    let finished = collector.finish_suite()?;
    let outputs: Vec<_> = finished
        .suite()
        .test_results
        .iter()
        .map(|result| (result.unique_id.as_str(), result.stdout.as_str()))
        .collect();
    assert_eq!(
        outputs,
        [("pkg.A/hello()", "hello"), ("pkg.B/world()", "world")]
    );

    Ok(())
}

#[test]
fn failure_records_throwable_and_stderr() -> Result<()> {
    let fixture = CollectorFixture::new();
    let collector = &fixture.collector;
    let divide = method_test("pkg.A", "divide()");

    collector.on_suite_start()?;
    collector.on_test_start(&divide)?;
    let payload = std::panic::catch_unwind(|| {
        kt_eprintln!("about to divide");
        panic!("boom");
    })
    .expect_err("test body panicked");
    fixture.clock.advance_ms(2);
    collector.on_test_finish(&divide, &TestExecutionResult::from_panic(payload.as_ref()))?;

    let finished = collector.finish_suite()?;
    let suite = finished.suite();
    assert_eq!(suite.failed, 1);
    assert!(!suite.is_success());

    let result = &suite.test_results[0];
    assert_eq!(result.status, TestStatus::Failed);
    assert_eq!(result.stderr, "about to divide\n");
    assert_eq!(result.stdout, "");
    let throwable = result.throwable.as_deref().unwrap_or_default();
    ensure!(throwable.contains("boom"), "throwable {throwable:?} mentions boom");

    Ok(())
}

#[test]
fn aborted_test_is_skipped() -> Result<()> {
    let fixture = CollectorFixture::new();
    let collector = &fixture.collector;
    let assumption = method_test("pkg.A", "onlyOnLinux()");

    collector.on_suite_start()?;
    collector.on_test_start(&assumption)?;
    collector.on_test_finish(&assumption, &TestExecutionResult::aborted(None))?;

    let finished = collector.finish_suite()?;
    let suite = finished.suite();
    assert_eq!(suite.total_tests, 1);
    assert_eq!(suite.skipped, 1);
    assert_eq!(suite.failed, 0);
    assert_eq!(suite.test_results[0].status, TestStatus::Aborted);

    Ok(())
}

#[test]
fn finish_without_start_is_rejected() -> Result<()> {
    let fixture = CollectorFixture::new();
    let collector = &fixture.collector;
    let orphan = method_test("pkg.A", "orphan()");

    collector.on_suite_start()?;
    let err = collector
        .on_test_finish(&orphan, &TestExecutionResult::successful())
        .expect_err("finish without start fails");
    let ReportError::Invariant(violation) = err else {
        panic!("expected an invariant violation, got {err:?}");
    };
    assert_eq!(
        violation,
        InvariantViolation::FinishWithoutStart {
            id: orphan.id().clone()
        }
    );

    let finished = collector.finish_suite()?;
    assert_eq!(finished.suite().total_tests, 0);

    Ok(())
}

#[test]
fn unfinished_test_is_left_out() -> Result<()> {
    let fixture = CollectorFixture::new();
    let collector = &fixture.collector;
    let finished_test = method_test("pkg.A", "add()");
    let hung = method_test("pkg.A", "hang()");

    collector.on_suite_start()?;
    collector.on_test_start(&finished_test)?;
    collector.on_test_finish(&finished_test, &TestExecutionResult::successful())?;
    collector.on_test_start(&hung)?;

    let finished = collector.finish_suite()?;
    let ids: Vec<_> = finished
        .suite()
        .test_results
        .iter()
        .map(|result| result.unique_id.as_str())
        .collect();
    assert_eq!(ids, ["pkg.A/add()"]);

    Ok(())
}
