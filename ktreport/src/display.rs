// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renders a report as a console summary.

use indexmap::IndexMap;
use ktreport_metadata::{SpecId, TestResultSummary, TestSuiteResult};
use owo_colors::{OwoColorize, Style, style};
use std::time::Duration;
use swrite::{SWrite, swrite, swriteln};

/// The width of section headings.
const HEADING_WIDTH: usize = 106;

/// The number of stack frames shown after each line of an error, by default.
pub(crate) const DEFAULT_STACK_FRAMES: usize = 7;

/// Styles for the report summary.
#[derive(Clone, Debug, Default)]
pub(crate) struct ReportStyles {
    pass: Style,
    fail: Style,
    bold: Style,
}

impl ReportStyles {
    pub(crate) fn colorize(&mut self) {
        self.pass = style().green();
        self.fail = style().red();
        self.bold = style().bold();
    }
}

/// Writes a [`TestSuiteResult`] out in a form meant for people.
#[derive(Clone, Debug)]
pub(crate) struct ReportDisplayer {
    stack_frames: usize,
    styles: ReportStyles,
}

impl ReportDisplayer {
    pub(crate) fn new(stack_frames: usize, styles: ReportStyles) -> Self {
        Self {
            stack_frames,
            styles,
        }
    }

    /// Renders the full summary: results per spec, then failures, then the totals.
    pub(crate) fn render(&self, suite: &TestSuiteResult) -> String {
        let mut results: Vec<_> = suite.test_results.iter().collect();
        results.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));

        let mut out = String::new();
        write_heading(&mut out, "ktreport");
        out.push('\n');
        self.write_specs(&mut out, &results);

        let failures: Vec<_> = results
            .iter()
            .copied()
            .filter(|result| result.is_failure())
            .collect();
        if !failures.is_empty() {
            out.push('\n');
            write_heading(&mut out, "failures");
            self.write_failures(&mut out, &failures);
        }

        out.push('\n');
        write_heading(&mut out, "short test summary info");
        self.write_summary(&mut out, suite);
        swriteln!(out, "{}", "=".repeat(HEADING_WIDTH));

        out
    }

    fn write_specs(&self, out: &mut String, results: &[&TestResultSummary]) {
        let mut specs: IndexMap<&SpecId, SpecSummary<'_>> = IndexMap::new();
        for &result in results {
            if result.spec_id.is_empty() {
                continue;
            }
            let spec = specs.entry(&result.spec_id).or_default();
            spec.results.push(result);
            spec.duration += result.duration();
        }

        for (spec_id, spec) in &specs {
            swrite!(out, "{spec_id} ");
            for result in &spec.results {
                if result.is_failure() {
                    swrite!(out, "{}", "F".style(self.styles.fail));
                } else {
                    swrite!(out, "{}", ".".style(self.styles.pass));
                }
            }
            swriteln!(out, " ({})", DisplaySeconds(spec.duration));
        }
    }

    fn write_failures(&self, out: &mut String, failures: &[&TestResultSummary]) {
        for (i, result) in failures.iter().enumerate() {
            if i > 0 {
                out.push_str("\n***\n");
            }

            swriteln!(
                out,
                "\n{} ({})\n",
                result.unique_id.style(self.styles.bold),
                DisplaySeconds(result.duration()),
            );

            if let Some(throwable) = &result.throwable {
                self.write_throwable(out, throwable);
            }

            let stdout = result.stdout.trim_end_matches(['\r', '\n']);
            if !result.stdout.is_empty() {
                swriteln!(out, "\nSTDOUT:\n{stdout}");
            }
            let stderr = result.stderr.trim_end_matches(['\r', '\n']);
            if !result.stderr.is_empty() {
                swriteln!(out, "\nSTDERR:\n{stderr}");
            }
        }
    }

    // Lines starting with `at ` are stack frames. At most `stack_frames` frames are shown after
    // each other line; the rest are summarized.
    fn write_throwable(&self, out: &mut String, throwable: &str) {
        let mut shown = 0_usize;
        let mut omitted = 0_usize;
        for line in throwable.trim().lines() {
            if !line.trim_start().starts_with("at ") {
                write_omitted(out, omitted);
                swriteln!(out, "{line}");
                shown = 0;
                omitted = 0;
            } else if shown < self.stack_frames {
                swriteln!(out, "{line}");
                shown += 1;
            } else {
                omitted += 1;
            }
        }
        write_omitted(out, omitted);
    }

    fn write_summary(&self, out: &mut String, suite: &TestSuiteResult) {
        if suite.failed > 0 {
            swrite!(out, "{} ", "FAILED".style(self.styles.fail));
        } else {
            swrite!(out, "{} ", "PASSED".style(self.styles.pass));
        }

        swrite!(out, "{} passed", suite.total_tests.saturating_sub(suite.failed));
        if suite.failed > 0 {
            swrite!(out, ", {} failed", suite.failed);
        }
        swriteln!(out, " in {}", DisplaySeconds(suite.total_duration()));
    }
}

#[derive(Debug, Default)]
struct SpecSummary<'a> {
    results: Vec<&'a TestResultSummary>,
    duration: Duration,
}

fn write_heading(out: &mut String, title: &str) {
    let prefix = format!("= {title} ");
    let fill = HEADING_WIDTH.saturating_sub(prefix.len());
    swriteln!(out, "{prefix}{}", "=".repeat(fill));
}

fn write_omitted(out: &mut String, omitted: usize) {
    if omitted > 0 {
        swriteln!(out, "... ({omitted} lines omitted)");
    }
}

/// Displays a duration as seconds with millisecond precision, e.g. `1.250s`.
struct DisplaySeconds(Duration);

impl std::fmt::Display for DisplaySeconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}
