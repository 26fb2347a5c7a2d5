// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    display::{DEFAULT_STACK_FRAMES, ReportDisplayer},
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ktreport_collector::ReportConfig;
use ktreport_metadata::{KtreportExitCode, TestSuiteResult};
use std::io::Write;
use tracing::{debug, info};

/// Summarizes the results of a test run recorded by ktreport-collector.
///
/// Results are grouped by specification, followed by details for every failed test and a
/// one-line summary.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct KtreportApp {
    /// Path to the JSON report [default: read from config, build/test-results/ktreport.json]
    #[arg(long, value_name = "PATH")]
    report: Option<Utf8PathBuf>,

    /// Config file [default: .config/ktreport.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Number of stack frames to show after each line of a failed test's error
    #[arg(long, short, value_name = "N", default_value_t = DEFAULT_STACK_FRAMES)]
    stack: usize,

    #[command(flatten)]
    output: OutputOpts,
}

impl KtreportApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let cwd = std::env::current_dir()
            .and_then(|dir| Utf8PathBuf::try_from(dir).map_err(|err| err.into_io_error()))
            .map_err(|err| ExpectedError::CurrentDirInvalid { err })?;

        let report_path = self.report_path(&cwd)?;
        if output.verbose {
            info!("reading test report from `{report_path}`");
        }
        let suite = read_report(&report_path)?;
        debug!(
            %report_path,
            total_tests = suite.total_tests,
            "read test report",
        );

        let displayer = ReportDisplayer::new(self.stack, output.report_styles());
        let rendered = displayer.render(&suite);

        let mut writer = output_writer.stdout_writer();
        writer
            .write_all(rendered.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|err| ExpectedError::WriteOutputError { err })?;

        if suite.failed > 0 {
            Ok(KtreportExitCode::TEST_RUN_FAILED)
        } else {
            Ok(KtreportExitCode::OK)
        }
    }

    fn report_path(&self, cwd: &Utf8Path) -> Result<Utf8PathBuf> {
        match &self.report {
            Some(report) => Ok(cwd.join(report)),
            None => {
                let config = ReportConfig::from_sources(cwd, self.config_file.as_deref())?;
                Ok(config.path().to_owned())
            }
        }
    }
}

fn read_report(path: &Utf8Path) -> Result<TestSuiteResult> {
    std::fs::File::open(path)
        .map_err(ktreport_metadata::ReportParseError::Io)
        .and_then(TestSuiteResult::from_reader)
        .map_err(|err| ExpectedError::report_read_error(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Color;
    use indoc::indoc;

    static REPORT: &str = indoc! {r#"
        {
          "testResults": [
            {
              "specId": "pkg.A",
              "uniqueId": "pkg.A/divide()",
              "identifier": { "displayName": "divide()", "type": "TEST", "tags": [] },
              "status": "FAILED",
              "startTime": 1700000000000,
              "durationMs": 3,
              "stdout": "",
              "stderr": "",
              "throwable": "boom"
            },
            {
              "specId": "pkg.A",
              "uniqueId": "pkg.A/add()",
              "identifier": { "displayName": "add()", "type": "TEST", "tags": [] },
              "status": "SUCCESSFUL",
              "startTime": 1700000000000,
              "durationMs": 5,
              "stdout": "",
              "stderr": "",
              "throwable": null
            }
          ],
          "totalTests": 2,
          "passed": 1,
          "failed": 1,
          "skipped": 0,
          "startTime": 1700000000000,
          "endTime": 1700000000010,
          "totalDurationMs": 10
        }
    "#};

    fn output() -> OutputContext {
        OutputContext {
            verbose: false,
            color: Color::Never,
        }
    }

    #[test]
    fn renders_report_and_fails() {
        let dir = camino_tempfile::tempdir().expect("temp dir created");
        let path = dir.path().join("ktreport.json");
        std::fs::write(&path, REPORT).expect("wrote report");

        let app = KtreportApp::parse_from(["ktreport", "--report", path.as_str(), "-s", "3"]);
        let mut writer = OutputWriter::Test { stdout: Vec::new() };
        let code = app.exec(output(), &mut writer).expect("exec succeeds");
        assert_eq!(code, KtreportExitCode::TEST_RUN_FAILED);

        let OutputWriter::Test { stdout } = writer else {
            unreachable!("writer is a test writer");
        };
        let stdout = String::from_utf8(stdout).expect("output is UTF-8");
        assert!(stdout.contains("pkg.A .F (0.008s)\n"), "{stdout}");
        assert!(stdout.contains("\npkg.A/divide() (0.003s)\n\nboom\n"), "{stdout}");
        assert!(
            stdout.contains("FAILED 1 passed, 1 failed in 0.010s\n"),
            "{stdout}"
        );
    }

    #[test]
    fn missing_report() {
        let dir = camino_tempfile::tempdir().expect("temp dir created");
        let path = dir.path().join("missing.json");

        let app = KtreportApp::parse_from(["ktreport", "--report", path.as_str()]);
        let err = app
            .exec(output(), &mut OutputWriter::Test { stdout: Vec::new() })
            .expect_err("missing report is an error");
        assert!(
            matches!(&err, ExpectedError::ReportReadError { path: p, .. } if *p == path),
            "{err:?}"
        );
        assert_eq!(err.process_exit_code(), KtreportExitCode::SETUP_ERROR);
    }

    #[test]
    fn default_stack_frames() {
        let app = KtreportApp::parse_from(["ktreport"]);
        assert_eq!(app.stack, DEFAULT_STACK_FRAMES);
        assert_eq!(app.report, None);
    }

    #[test]
    fn verify_app() {
        use clap::CommandFactory;
        KtreportApp::command().debug_assert();
    }
}
