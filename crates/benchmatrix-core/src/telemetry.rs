//! Tracing subscriber setup for the harness.
//!
//! The CLI prints one result line per run unit on stdout, so every log line
//! goes to stderr. Piping `benchmatrix run` into another tool sees results
//! only.

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter honouring `RUST_LOG`, falling back to `level`.
fn log_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

/// Install the global subscriber: human-readable or JSON lines on stderr.
///
/// Only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let registry = tracing_subscriber::registry().with(log_filter(level));

    let installed = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
