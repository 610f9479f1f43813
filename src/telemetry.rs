//! Structured logging setup
//!
//! One `tracing-subscriber` registry with an `EnvFilter` and a fmt layer.
//! `RUST_LOG` wins when set; otherwise `observability.log_level` applies to
//! this crate and to the HTTP request traces from `tower_http`.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Level used when the configured one cannot be parsed
const FALLBACK_LEVEL: &str = "info";

/// Filter directive for a configured level
pub fn default_directive(level: &str) -> String {
    format!("autollm={level},tower_http={level}")
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(default_directive(level))
        .unwrap_or_else(|_| EnvFilter::new(default_directive(FALLBACK_LEVEL)))
}

/// Install the global subscriber
///
/// Only the first call in a process has an effect.
///
/// # Examples
///
/// ```no_run
/// autollm::telemetry::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();

        tracing::debug!(level, "Telemetry initialized");
    });
}
