//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Derive the filter from the configured level and database debug flag
//! - Let `RUST_LOG` override everything
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `silent` turns every target off
//! - Driver command logging is a separate directive so it survives a quiet level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, LogLevel};

/// Tracing target the MongoDB driver logs commands under.
pub const DRIVER_COMMAND_TARGET: &str = "mongodb.command";

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(config: &AppConfig) -> String {
    let level = config.logging.level;
    let mut directives = vec![level.as_directive().to_string()];

    if level != LogLevel::Silent {
        directives.push(format!("tower_http={}", level.as_directive()));
    }
    if config.database.debug {
        directives.push(format!("{}=debug", DRIVER_COMMAND_TARGET));
    }

    directives.join(",")
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
