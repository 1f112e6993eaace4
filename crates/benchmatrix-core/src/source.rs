//! Source libraries.
//!
//! A [`SourceSet`] binds a library name to the files a glob resolved to at
//! registration time. It is immutable once built. [`SourceCatalog`] holds
//! every library of a run and enforces unique library names.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{MatrixError, MatrixResult};
use crate::pattern::PathGlob;

/// An immutable, named set of source files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSet {
    library_name: String,
    pattern: String,
    files: BTreeSet<PathBuf>,
}

impl SourceSet {
    /// Resolve `glob_pattern` against the filesystem and bind the result to
    /// `library_name`.
    ///
    /// Fails with [`MatrixError::NotFound`] when nothing matches, and with
    /// [`MatrixError::Unreadable`] when a matched file cannot be opened.
    pub fn register(library_name: &str, glob_pattern: &str) -> MatrixResult<Self> {
        let glob = PathGlob::new(glob_pattern)?;
        let mut files = BTreeSet::new();

        if glob.root().is_dir() {
            let mut walker = WalkDir::new(glob.root()).min_depth(1).follow_links(true);
            if let Some(depth) = glob.max_depth() {
                walker = walker.max_depth(depth);
            }

            for entry in walker {
                let entry = entry.map_err(|e| MatrixError::Walk(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(relative) = entry.path().strip_prefix(glob.root()) else {
                    continue;
                };
                if !glob.matches_relative(relative) {
                    continue;
                }

                let path = entry.path().to_path_buf();
                File::open(&path).map_err(|source| MatrixError::Unreadable {
                    path: path.clone(),
                    source,
                })?;
                files.insert(path);
            }
        }

        if files.is_empty() {
            return Err(MatrixError::NotFound {
                library: library_name.to_string(),
                pattern: glob_pattern.to_string(),
            });
        }

        debug!(library = %library_name, pattern = %glob_pattern, files = files.len(), "registered source library");

        Ok(Self {
            library_name: library_name.to_string(),
            pattern: glob_pattern.to_string(),
            files,
        })
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    /// The glob this set was resolved from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// All libraries registered for one run, keyed by name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceCatalog {
    libraries: BTreeMap<String, SourceSet>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `library_name` from `glob_pattern` and return the new set.
    pub fn add(&mut self, library_name: &str, glob_pattern: &str) -> MatrixResult<&SourceSet> {
        if self.libraries.contains_key(library_name) {
            return Err(MatrixError::DuplicateLibrary {
                name: library_name.to_string(),
            });
        }
        let set = SourceSet::register(library_name, glob_pattern)?;
        Ok(self
            .libraries
            .entry(library_name.to_string())
            .or_insert(set))
    }

    pub fn get(&self, library_name: &str) -> Option<&SourceSet> {
        self.libraries.get(library_name)
    }

    /// Libraries in name order.
    pub fn libraries(&self) -> impl Iterator<Item = &SourceSet> {
        self.libraries.values()
    }

    /// Every registered file, library by library.
    pub fn all_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.libraries.values().flat_map(|set| set.files().iter())
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}
