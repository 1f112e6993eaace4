//! Bench discovery.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::SimulationBackend;
use crate::error::{MatrixError, MatrixResult};
use crate::source::SourceSet;

/// One independently runnable, self-checking test entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bench {
    pub id: String,
    pub library: String,
    pub source_ref: PathBuf,
}

impl Bench {
    pub fn new(id: impl Into<String>, library: impl Into<String>, source_ref: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            library: library.into(),
            source_ref: source_ref.into(),
        }
    }

    /// Bench id for a source file: its stem.
    pub fn id_for(source: &Path) -> Option<String> {
        source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
    }
}

/// Benches discovered in a test library, ordered by id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BenchRegistry {
    benches: BTreeMap<String, Bench>,
}

impl BenchRegistry {
    /// Discover benches in `source_set` using the backend's recognition
    /// predicate.
    ///
    /// Fails with [`MatrixError::Discovery`] when nothing is recognized and
    /// with [`MatrixError::DuplicateBench`] when two files share an id.
    pub fn discover(source_set: &SourceSet, backend: &dyn SimulationBackend) -> MatrixResult<Self> {
        let mut benches: BTreeMap<String, Bench> = BTreeMap::new();

        for file in source_set.files() {
            if !backend.is_bench(file) {
                continue;
            }
            let Some(id) = Bench::id_for(file) else {
                continue;
            };
            if let Some(existing) = benches.get(&id) {
                return Err(MatrixError::DuplicateBench {
                    id,
                    first: existing.source_ref.clone(),
                    second: file.clone(),
                });
            }
            debug!(bench = %id, source = ?file, "discovered bench");
            benches.insert(
                id.clone(),
                Bench::new(id, source_set.library_name(), file.clone()),
            );
        }

        if benches.is_empty() {
            return Err(MatrixError::Discovery {
                library: source_set.library_name().to_string(),
            });
        }

        Ok(Self { benches })
    }

    /// Build a registry from already-known benches.
    pub fn from_benches(benches: impl IntoIterator<Item = Bench>) -> MatrixResult<Self> {
        let mut map: BTreeMap<String, Bench> = BTreeMap::new();
        for bench in benches {
            if let Some(existing) = map.get(&bench.id) {
                return Err(MatrixError::DuplicateBench {
                    id: bench.id.clone(),
                    first: existing.source_ref.clone(),
                    second: bench.source_ref.clone(),
                });
            }
            map.insert(bench.id.clone(), bench);
        }
        Ok(Self { benches: map })
    }

    /// Benches in lexicographic id order.
    pub fn benches(&self) -> Vec<Bench> {
        self.benches.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bench> {
        self.benches.values()
    }

    pub fn get(&self, id: &str) -> Option<&Bench> {
        self.benches.get(id)
    }

    pub fn len(&self) -> usize {
        self.benches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.benches.is_empty()
    }
}
