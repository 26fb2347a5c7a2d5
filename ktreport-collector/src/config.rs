// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the collector.
//!
//! Configuration is read from three layers, with later layers taking priority:
//!
//! 1. The default config embedded in this crate (see [`ReportConfig::DEFAULT_CONFIG`]).
//! 2. A repository config file, `.config/ktreport.toml` in the base directory by default.
//! 3. Environment variables of the form `KTREPORT_REPORT__<KEY>`, for example
//!    `KTREPORT_REPORT__PATH=out/report.json`.

use crate::errors::ConfigParseError;
use camino::{Utf8Path, Utf8PathBuf};
use config::{
    Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, Map, Source,
    builder::DefaultState,
};
use serde::Deserialize;
use tracing::debug;

/// Resolved collector configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportConfig {
    path: Utf8PathBuf,
    pretty: bool,
    print_confirmation: bool,
}

impl ReportConfig {
    /// The default location of the config within the base directory.
    pub const CONFIG_PATH: &'static str = ".config/ktreport.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Environment configuration uses this prefix, plus a _.
    pub const ENVIRONMENT_PREFIX: &'static str = "KTREPORT";

    /// Reads the config from the given file, or if not specified from `.config/ktreport.toml`
    /// within `base_dir`, then applies overrides from the environment.
    ///
    /// If no config file is specified and `base_dir` doesn't contain `.config/ktreport.toml`,
    /// the default config is used. A relative report path is resolved against `base_dir`.
    pub fn from_sources(
        base_dir: impl AsRef<Utf8Path>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_impl(base_dir.as_ref(), config_file, None)
    }

    /// Returns the default config, with relative paths resolved against `base_dir`.
    ///
    /// Environment variables are not consulted.
    pub fn default_config(base_dir: impl AsRef<Utf8Path>) -> Self {
        let deserialized: ReportConfigDeserialize = Self::make_default_config()
            .build()
            .and_then(|config| config.try_deserialize())
            .expect("default config is always valid");
        deserialized.into_config(base_dir.as_ref())
    }

    /// Creates a config from explicit values.
    pub fn new(path: impl Into<Utf8PathBuf>, pretty: bool, print_confirmation: bool) -> Self {
        Self {
            path: path.into(),
            pretty,
            print_confirmation,
        }
    }

    /// Returns the path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns true if the report should be indented.
    pub fn pretty(&self) -> bool {
        self.pretty
    }

    /// Returns true if a confirmation line should be printed once the report is written.
    pub fn print_confirmation(&self) -> bool {
        self.print_confirmation
    }

    /// Sets the path the report is written to.
    pub fn set_path(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.path = path.into();
        self
    }

    /// Sets whether a confirmation line should be printed.
    pub fn set_print_confirmation(&mut self, print_confirmation: bool) -> &mut Self {
        self.print_confirmation = print_confirmation;
        self
    }

    // ---
    // Helper methods
    // ---

    // Tests pass in a fixed environment rather than reading the process environment.
    fn from_sources_impl(
        base_dir: &Utf8Path,
        file: Option<&Utf8Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = base_dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };
        debug!(%config_file, "reading ktreport config");

        let deserialized: ReportConfigDeserialize =
            Self::add_environment(Self::make_default_config().add_source(source), env)
                .and_then(|builder| builder.build())
                .and_then(|config| config.try_deserialize())
                .map_err(|err| ConfigParseError::new(&config_file, err))?;

        Ok(deserialized.into_config(base_dir))
    }

    // Environment variable names can't contain dashes, so `KTREPORT_REPORT__PRINT_CONFIRMATION`
    // arrives as `report.print_confirmation` and is mapped onto the kebab-case key here.
    fn add_environment(
        mut builder: ConfigBuilder<DefaultState>,
        env: Option<Map<String, String>>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let overrides = Environment::with_prefix(Self::ENVIRONMENT_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env)
            .collect()?;
        for (key, value) in overrides {
            builder = builder.set_override(key.replace('_', "-"), value)?;
        }
        Ok(builder)
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportConfigDeserialize {
    report: ReportSectionDeserialize,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportSectionDeserialize {
    path: Utf8PathBuf,
    pretty: bool,
    print_confirmation: bool,
}

impl ReportConfigDeserialize {
    fn into_config(self, base_dir: &Utf8Path) -> ReportConfig {
        let ReportSectionDeserialize {
            path,
            pretty,
            print_confirmation,
        } = self.report;
        ReportConfig {
            // join returns `path` unchanged if it is absolute.
            path: base_dir.join(path),
            pretty,
            print_confirmation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn temp_dir() -> Utf8TempDir {
        camino_tempfile::Builder::new()
            .prefix("ktreport-config-")
            .tempdir()
            .expect("temp dir created")
    }

    fn write_config(dir: &Utf8Path, contents: &str) {
        let config_dir = dir.join(".config");
        std::fs::create_dir_all(&config_dir).expect("created .config");
        std::fs::write(config_dir.join("ktreport.toml"), contents).expect("wrote config");
    }

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        )
    }

    #[test]
    fn default_config_is_valid() {
        let config = ReportConfig::default_config("/work");
        assert_eq!(
            config,
            ReportConfig::new("/work/build/test-results/ktreport.json", true, true)
        );
    }

    #[test]
    fn missing_repo_config_uses_defaults() {
        let dir = temp_dir();
        let config = ReportConfig::from_sources_impl(dir.path(), None, env(&[]))
            .expect("default config parses");
        assert_eq!(config, ReportConfig::default_config(dir.path()));
    }

    #[test]
    fn repo_config_overrides_defaults() {
        let dir = temp_dir();
        write_config(
            dir.path(),
            indoc! {r#"
                [report]
                path = "target/report.json"
                print-confirmation = false
            "#},
        );

        let config = ReportConfig::from_sources_impl(dir.path(), None, env(&[]))
            .expect("repo config parses");
        assert_eq!(config.path(), dir.path().join("target/report.json"));
        assert!(config.pretty(), "pretty keeps its default");
        assert!(!config.print_confirmation());
    }

    #[test_case("KTREPORT_REPORT__PRETTY", "false" ; "pretty")]
    #[test_case("KTREPORT_REPORT__PRINT_CONFIRMATION", "false" ; "print confirmation")]
    fn environment_overrides_repo_config(key: &str, value: &str) {
        let dir = temp_dir();
        write_config(
            dir.path(),
            indoc! {r#"
                [report]
                pretty = true
                print-confirmation = true
            "#},
        );

        let config = ReportConfig::from_sources_impl(dir.path(), None, env(&[(key, value)]))
            .expect("config parses");
        assert!(
            !(config.pretty() && config.print_confirmation()),
            "{key} was applied: {config:?}"
        );
    }

    #[test]
    fn environment_overrides_path() {
        let dir = temp_dir();
        let config = ReportConfig::from_sources_impl(
            dir.path(),
            None,
            env(&[("KTREPORT_REPORT__PATH", "/abs/out.json")]),
        )
        .expect("config parses");
        assert_eq!(config.path(), "/abs/out.json");
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = temp_dir();
        let missing = dir.path().join("missing.toml");
        let err = ReportConfig::from_sources_impl(dir.path(), Some(&missing), env(&[]))
            .expect_err("missing explicit config file is an error");
        assert_eq!(err.config_file(), missing);
    }

    #[test]
    fn invalid_value_is_an_error() {
        let dir = temp_dir();
        write_config(
            dir.path(),
            indoc! {r#"
                [report]
                pretty = "sometimes"
            "#},
        );

        let err = ReportConfig::from_sources_impl(dir.path(), None, env(&[]))
            .expect_err("invalid config is an error");
        assert_eq!(err.config_file(), dir.path().join(ReportConfig::CONFIG_PATH));
    }
}
