//! Tracing initialization for bandaid binaries and integration tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Output shape selected by configuration: compact for a human terminal,
/// JSON for machine-consumed log shipping (still local — no export client).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Initializes the global tracing subscriber. Safe to call more than once
/// per process in tests; subsequent calls are no-ops.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Compact => fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => fmt().with_env_filter(filter).json().try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized, skipping");
    }
}
