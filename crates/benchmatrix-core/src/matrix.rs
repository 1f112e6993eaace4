//! Configuration matrix and run-unit expansion.
//!
//! Every registered [`ParameterSet`] is attached to every bench its
//! [`BenchSelector`] accepts. Expansion is bench-major, config-minor: for
//! benches `[b1, b2]` and configs `[c1, c2]` the units come out as
//! `(b1,c1) (b1,c2) (b2,c1) (b2,c2)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bench::Bench;
use crate::error::{MatrixError, MatrixResult};
use crate::params::{render_bindings, Bindings};
use crate::pattern::NamePattern;

/// Which benches a parameter set applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BenchSelector {
    #[default]
    All,
    Matching(NamePattern),
}

impl BenchSelector {
    pub fn matching(pattern: &str) -> MatrixResult<Self> {
        Ok(BenchSelector::Matching(NamePattern::new(pattern)?))
    }

    pub fn accepts(&self, bench: &Bench) -> bool {
        match self {
            BenchSelector::All => true,
            BenchSelector::Matching(pattern) => pattern.matches(&bench.id),
        }
    }
}

/// A named set of parameter bindings ("config").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    pub name: String,
    pub bindings: Bindings,
    pub selector: BenchSelector,
}

/// One concrete (bench, config) execution request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunUnit {
    pub bench_id: String,
    pub config_name: String,
    pub bindings: Bindings,
}

impl RunUnit {
    pub fn new(bench_id: impl Into<String>, config_name: impl Into<String>, bindings: Bindings) -> Self {
        Self {
            bench_id: bench_id.into(),
            config_name: config_name.into(),
            bindings,
        }
    }

    /// `<bench_id>.<config_name>`, the name test filters match against.
    pub fn name(&self) -> String {
        format!("{}.{}", self.bench_id, self.config_name)
    }
}

impl fmt::Display for RunUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bindings.is_empty() {
            write!(f, "{}.{}", self.bench_id, self.config_name)
        } else {
            write!(
                f,
                "{}.{} [{}]",
                self.bench_id,
                self.config_name,
                render_bindings(&self.bindings)
            )
        }
    }
}

/// Registered parameter sets, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ConfigMatrix {
    configs: Vec<ParameterSet>,
}

impl ConfigMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a config applied to every bench.
    pub fn add_config(&mut self, name: &str, bindings: Bindings) -> MatrixResult<()> {
        self.add_config_for(name, bindings, BenchSelector::All)
    }

    /// Register a config applied only to benches `selector` accepts.
    pub fn add_config_for(
        &mut self,
        name: &str,
        bindings: Bindings,
        selector: BenchSelector,
    ) -> MatrixResult<()> {
        if self.configs.iter().any(|c| c.name == name) {
            return Err(MatrixError::DuplicateConfig {
                name: name.to_string(),
            });
        }
        self.configs.push(ParameterSet {
            name: name.to_string(),
            bindings,
            selector,
        });
        Ok(())
    }

    pub fn configs(&self) -> &[ParameterSet] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Attach configs to benches, bench-major and config-minor.
    ///
    /// Returns an empty list when no configs are registered; callers must
    /// treat that as a configuration error.
    pub fn expand(&self, benches: &[Bench]) -> Vec<RunUnit> {
        benches
            .iter()
            .flat_map(|bench| {
                self.configs
                    .iter()
                    .filter(move |config| config.selector.accepts(bench))
                    .map(move |config| {
                        RunUnit::new(bench.id.clone(), config.name.clone(), config.bindings.clone())
                    })
            })
            .collect()
    }
}
