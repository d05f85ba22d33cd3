//! Tracing/logging initialization for the receiver binary.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the env filter, honouring `RUST_LOG` when it is set.
fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global tracing subscriber.
///
/// * `default_filter` -- filter used when `RUST_LOG` is absent or invalid
///   (e.g. `"relayhub_receiver=info"`).
/// * `log_json` -- emit one JSON object per event for log aggregation
///   instead of the human-readable format.
///
/// Fails if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str, log_json: bool) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(default_filter));
    if log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    }
}
