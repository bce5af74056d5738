//! Logging sink.
//!
//! The worker always logs through `tracing`. Embedding callers who don't
//! wire up a `tracing` subscriber can additionally register a printf-style
//! sink closure, mirroring the Python SDK's configurable `logger` option.

use std::sync::Arc;

/// A printf-style logging sink: receives a fully formatted line.
pub type LoggerFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Emit a line to both `tracing` (always) and the optional sink (if set).
pub(crate) fn emit(sink: Option<&LoggerFn>, line: &str) {
    tracing::debug!("{line}");
    if let Some(sink) = sink {
        sink(line);
    }
}

/// Install a default `tracing-subscriber` env-filter subscriber.
///
/// Convenience for embedding binaries that don't already initialize
/// `tracing`; safe to call more than once (subsequent calls are no-ops).
pub fn init_default_subscriber() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
