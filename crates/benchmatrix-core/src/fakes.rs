//! In-memory backend fake (testing only)
//!
//! [`ScriptedBackend`] satisfies the [`SimulationBackend`] contract without a
//! toolchain. Every (bench, config) pair passes instantly unless scripted
//! otherwise.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{BackendReport, SimulationBackend, Verdict};
use crate::bench::Bench;
use crate::error::{BackendError, BackendResult};
use crate::params::{render_bindings, Bindings};
use crate::source::SourceCatalog;

#[derive(Debug, Clone)]
struct Script {
    verdict: Verdict,
    error: Option<BackendError>,
    delay: Option<Duration>,
    panic: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            verdict: Verdict::Pass,
            error: None,
            delay: None,
            panic: false,
        }
    }
}

/// Backend whose behaviour is scripted per (bench id, config name).
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    bench_prefix: Option<String>,
    scripts: HashMap<(String, String), Script>,
    declared: HashMap<String, BTreeSet<String>>,
    prepare_error: Option<BackendError>,
    prepared: AtomicBool,
    invocations: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognize only files whose stem starts with `prefix`.
    pub fn with_bench_prefix(mut self, prefix: &str) -> Self {
        self.bench_prefix = Some(prefix.to_string());
        self
    }

    fn script(&mut self, bench: &str, config: &str) -> &mut Script {
        self.scripts
            .entry((bench.to_string(), config.to_string()))
            .or_default()
    }

    /// Report `FAIL` for this pair.
    pub fn fail(mut self, bench: &str, config: &str) -> Self {
        self.script(bench, config).verdict = Verdict::Fail;
        self
    }

    /// Return a backend error for this pair.
    pub fn error(mut self, bench: &str, config: &str, message: &str) -> Self {
        self.script(bench, config).error = Some(BackendError::Invocation(message.to_string()));
        self
    }

    /// Sleep before answering for this pair.
    pub fn delay(mut self, bench: &str, config: &str, delay: Duration) -> Self {
        self.script(bench, config).delay = Some(delay);
        self
    }

    /// Panic inside `execute` for this pair.
    pub fn panic_on(mut self, bench: &str, config: &str) -> Self {
        self.script(bench, config).panic = true;
        self
    }

    /// Declare the parameters `bench` accepts.
    pub fn declare(mut self, bench: &str, params: &[&str]) -> Self {
        self.declared.insert(
            bench.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    /// Make [`SimulationBackend::prepare`] fail.
    pub fn fail_prepare(mut self, message: &str) -> Self {
        self.prepare_error = Some(BackendError::Unavailable(message.to_string()));
        self
    }

    pub fn prepared(&self) -> bool {
        self.prepared.load(Ordering::SeqCst)
    }

    /// Number of `execute` calls so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous `execute` calls observed.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// (bench, config) pairs in the order `execute` was entered.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SimulationBackend for ScriptedBackend {
    fn is_bench(&self, source: &Path) -> bool {
        match (&self.bench_prefix, Bench::id_for(source)) {
            (Some(prefix), Some(id)) => id.starts_with(prefix.as_str()),
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    fn declared_parameters(&self, bench: &Bench) -> Option<BTreeSet<String>> {
        self.declared.get(&bench.id).cloned()
    }

    async fn prepare(&self, _sources: &SourceCatalog) -> BackendResult<()> {
        self.prepared.store(true, Ordering::SeqCst);
        match &self.prepare_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn execute(
        &self,
        bench: &Bench,
        config_name: &str,
        bindings: &Bindings,
    ) -> BackendResult<BackendReport> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((bench.id.clone(), config_name.to_string()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let script = self
            .scripts
            .get(&(bench.id.clone(), config_name.to_string()))
            .cloned()
            .unwrap_or_default();

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }
        if script.panic {
            panic!("scripted panic in {}.{}", bench.id, config_name);
        }
        if let Some(err) = script.error {
            return Err(err);
        }

        let detail = format!("{}.{} [{}]", bench.id, config_name, render_bindings(bindings));
        Ok(BackendReport {
            verdict: script.verdict,
            detail,
        })
    }
}
