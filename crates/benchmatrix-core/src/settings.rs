//! Harness settings: defaults, then the TOML matrix file, then CLI overrides.
//!
//! # Matrix file
//!
//! ```toml
//! [sources]
//! axis_rle = "src/*.vhd"
//!
//! [tests]
//! library = "tests"
//! pattern = "tests/*.vhd"
//!
//! [[config]]
//! name = "S8-C8"
//! generics = { SYMBOL_WIDTH = 8, COUNTER_WIDTH = 8 }
//!
//! [[config]]
//! name = "S8-C3"
//! benches = "tb_rle*"
//! generics = { SYMBOL_WIDTH = 8, COUNTER_WIDTH = 3 }
//!
//! [run]
//! workers = 4
//! unit_timeout_secs = 600
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{MatrixError, MatrixResult};
use crate::executor::{default_workers, ExecutorConfig};
use crate::matrix::{BenchSelector, ConfigMatrix};
use crate::params::Bindings;
use crate::pattern::NamePattern;
use crate::pipeline::{HarnessSpec, LibrarySpec};

/// Library name used for benches when none is given.
pub const DEFAULT_TEST_LIBRARY: &str = "tests";

/// Library name used for design sources when none is given.
pub const DEFAULT_SOURCE_LIBRARY: &str = "src";

fn default_test_library() -> String {
    DEFAULT_TEST_LIBRARY.to_string()
}

/// `[tests]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestsSection {
    #[serde(default = "default_test_library")]
    pub library: String,
    pub pattern: String,
}

/// One `[[config]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigEntry {
    pub name: String,
    /// Bench-id wildcard; absent means every bench.
    #[serde(default)]
    pub benches: Option<String>,
    #[serde(default)]
    pub generics: Bindings,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, generics: Bindings) -> Self {
        Self {
            name: name.into(),
            benches: None,
            generics,
        }
    }
}

/// `[run]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    pub workers: Option<usize>,
    pub unit_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub fail_fast: Option<bool>,
}

/// Parsed matrix file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixFile {
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
    pub tests: Option<TestsSection>,
    #[serde(default, rename = "config")]
    pub configs: Vec<ConfigEntry>,
    #[serde(default)]
    pub run: RunSection,
}

impl MatrixFile {
    pub fn parse(text: &str) -> MatrixResult<Self> {
        toml::from_str(text).map_err(|e| MatrixError::Settings(e.to_string()))
    }

    pub fn load(path: &Path) -> MatrixResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MatrixError::Settings(format!("cannot read {:?}: {e}", path)))?;
        Self::parse(&text)
    }
}

/// Values given on the command line. `None`/empty leaves the file value.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub sources: Option<LibrarySpec>,
    pub tests: Option<LibrarySpec>,
    pub configs: Vec<ConfigEntry>,
    pub filters: Vec<String>,
    pub workers: Option<usize>,
    pub unit_timeout: Option<Duration>,
    pub global_timeout: Option<Duration>,
    pub fail_fast: bool,
}

/// Fully merged settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessSettings {
    pub libraries: Vec<LibrarySpec>,
    pub test_library: Option<LibrarySpec>,
    pub configs: Vec<ConfigEntry>,
    pub filters: Vec<String>,
    pub workers: usize,
    pub unit_timeout: Option<Duration>,
    pub global_timeout: Option<Duration>,
    pub fail_fast: bool,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            libraries: Vec::new(),
            test_library: None,
            configs: Vec::new(),
            filters: Vec::new(),
            workers: default_workers(),
            unit_timeout: None,
            global_timeout: None,
            fail_fast: false,
        }
    }
}

impl HarnessSettings {
    /// Defaults overlaid with a matrix file.
    pub fn from_file(file: MatrixFile) -> Self {
        let defaults = Self::default();
        Self {
            libraries: file
                .sources
                .into_iter()
                .map(|(name, pattern)| LibrarySpec::new(name, pattern))
                .collect(),
            test_library: file
                .tests
                .map(|t| LibrarySpec::new(t.library, t.pattern)),
            configs: file.configs,
            filters: Vec::new(),
            workers: file.run.workers.unwrap_or(defaults.workers),
            unit_timeout: file.run.unit_timeout_secs.map(Duration::from_secs),
            global_timeout: file.run.timeout_secs.map(Duration::from_secs),
            fail_fast: file.run.fail_fast.unwrap_or(defaults.fail_fast),
        }
    }

    /// Apply command-line overrides on top.
    ///
    /// A source library with the same name as a file library replaces it.
    /// Command-line configs are appended after file configs.
    pub fn apply(&mut self, overrides: SettingsOverrides) {
        if let Some(src) = overrides.sources {
            self.libraries.retain(|l| l.name != src.name);
            self.libraries.push(src);
        }
        if let Some(tests) = overrides.tests {
            self.test_library = Some(tests);
        }
        self.configs.extend(overrides.configs);
        self.filters.extend(overrides.filters);
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if overrides.unit_timeout.is_some() {
            self.unit_timeout = overrides.unit_timeout;
        }
        if overrides.global_timeout.is_some() {
            self.global_timeout = overrides.global_timeout;
        }
        self.fail_fast |= overrides.fail_fast;
    }

    /// Build the harness spec, registering configs in order.
    ///
    /// Fails on a missing test library, duplicate config names and invalid
    /// selector or filter patterns.
    pub fn to_spec(&self) -> MatrixResult<HarnessSpec> {
        let test_library = self.test_library.clone().ok_or_else(|| {
            MatrixError::Settings(
                "no test library given (use --tests or a [tests] table)".to_string(),
            )
        })?;

        let mut configs = ConfigMatrix::new();
        for entry in &self.configs {
            let selector = match &entry.benches {
                Some(pattern) => BenchSelector::matching(pattern)?,
                None => BenchSelector::All,
            };
            configs.add_config_for(&entry.name, entry.generics.clone(), selector)?;
        }

        let mut spec = HarnessSpec::new(test_library, configs);
        spec.libraries = self.libraries.clone();
        for filter in &self.filters {
            spec = spec.with_filter(NamePattern::new(filter)?);
        }
        Ok(spec)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            workers: self.workers,
            unit_timeout: self.unit_timeout,
            fail_fast: self.fail_fast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    const SAMPLE: &str = r#"
[sources]
axis_rle = "src/*.vhd"

[tests]
pattern = "tests/*.vhd"

[[config]]
name = "S8-C8"
generics = { SYMBOL_WIDTH = 8, COUNTER_WIDTH = 8 }

[[config]]
name = "S8-C3"
benches = "tb_rle*"
generics = { SYMBOL_WIDTH = 8, COUNTER_WIDTH = 3 }

[run]
workers = 3
unit_timeout_secs = 600
"#;

    #[test]
    fn test_parse_sample_file() {
        let file = MatrixFile::parse(SAMPLE).unwrap();
        assert_eq!(file.sources["axis_rle"], "src/*.vhd");
        assert_eq!(file.tests.as_ref().unwrap().library, "tests");
        assert_eq!(file.configs.len(), 2);
        assert_eq!(file.configs[1].benches.as_deref(), Some("tb_rle*"));
        assert_eq!(file.configs[0].generics["COUNTER_WIDTH"], ParamValue::Int(8));
        assert_eq!(file.run.workers, Some(3));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = MatrixFile::parse("[run]\nthreads = 2\n").unwrap_err();
        assert!(matches!(err, MatrixError::Settings(_)));
    }

    #[test]
    fn test_from_file_applies_run_section() {
        let settings = HarnessSettings::from_file(MatrixFile::parse(SAMPLE).unwrap());
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.unit_timeout, Some(Duration::from_secs(600)));
        assert!(!settings.fail_fast);
        assert_eq!(settings.libraries, vec![LibrarySpec::new("axis_rle", "src/*.vhd")]);
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = HarnessSettings::from_file(MatrixFile::parse(SAMPLE).unwrap());
        settings.apply(SettingsOverrides {
            tests: Some(LibrarySpec::new("tests", "other/*.vhd")),
            workers: Some(8),
            fail_fast: true,
            configs: vec![ConfigEntry::new("S4-C2", Bindings::new())],
            ..SettingsOverrides::default()
        });

        assert_eq!(settings.workers, 8);
        assert!(settings.fail_fast);
        assert_eq!(settings.test_library.as_ref().unwrap().pattern, "other/*.vhd");
        let names: Vec<_> = settings.configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["S8-C8", "S8-C3", "S4-C2"]);
    }

    #[test]
    fn test_to_spec_requires_test_library() {
        let err = HarnessSettings::default().to_spec().unwrap_err();
        assert!(matches!(err, MatrixError::Settings(_)));
    }

    #[test]
    fn test_to_spec_rejects_duplicate_config() {
        let mut settings = HarnessSettings::from_file(MatrixFile::parse(SAMPLE).unwrap());
        settings.apply(SettingsOverrides {
            configs: vec![ConfigEntry::new("S8-C8", Bindings::new())],
            ..SettingsOverrides::default()
        });
        let err = settings.to_spec().unwrap_err();
        assert!(matches!(err, MatrixError::DuplicateConfig { .. }));
    }

    #[test]
    fn test_to_spec_keeps_registration_order_and_selectors() {
        let settings = HarnessSettings::from_file(MatrixFile::parse(SAMPLE).unwrap());
        let spec = settings.to_spec().unwrap();
        let configs = spec.configs.configs();
        assert_eq!(configs[0].name, "S8-C8");
        assert_eq!(configs[0].selector, BenchSelector::All);
        assert!(matches!(configs[1].selector, BenchSelector::Matching(_)));
    }
}
