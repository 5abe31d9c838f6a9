//! Diagnostic logging on stderr.
//!
//! `TOTORO_LOG` (or `RUST_LOG`) sets the filter; `--verbose`
//! forces `debug`. `TOTORO_LOG_FORMAT=json` emits JSON lines.

use std::io;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn";

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("totoro=debug");
    }
    std::env::var("TOTORO_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(|_| EnvFilter::new(DEFAULT_FILTER), EnvFilter::new)
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: bool) {
    let json = std::env::var("TOTORO_LOG_FORMAT").is_ok_and(|f| f == "json");
    let registry = tracing_subscriber::registry().with(env_filter(verbose));

    let result = if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(io::stderr))
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(json, "logging initialized");
    }
}
