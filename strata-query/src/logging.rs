//! Logging infrastructure for Strata.
//!
//! This module provides structured logging controlled by the `STRATA_DEBUG` environment variable.
//!
//! # Environment Variables
//!
//! - `STRATA_DEBUG=true` - Enable debug logging
//! - `STRATA_DEBUG=1` - Enable debug logging
//! - `STRATA_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `STRATA_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use strata_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```
//!
//! # Internal Logging
//!
//! Within Strata, use the standard tracing macros:
//!
//! ```rust,ignore
//! use tracing::{debug, trace};
//!
//! debug!(alias = %alias, offset, columns, "Registered loader columns");
//! trace!(key = %key, "Dropping row without a parent reference");
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `STRATA_DEBUG` environment variable.
///
/// Returns `true` if `STRATA_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("STRATA_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `STRATA_LOG_LEVEL` environment variable.
///
/// Defaults to "debug" if `STRATA_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("STRATA_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `STRATA_LOG_FORMAT` environment variable.
///
/// Defaults to "json" for structured logging.
pub fn get_log_format() -> &'static str {
    env::var("STRATA_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the Strata logging system.
///
/// This should be called once at application startup. Subsequent calls are no-ops.
/// Without the `tracing-subscriber` feature nothing is installed and events
/// go to whatever subscriber the application set up.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("STRATA_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "strata_orm={},strata_query={}",
                level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match get_log_format() {
                "json" => registry.with(fmt::layer().json()).try_init(),
                "compact" => registry.with(fmt::layer().compact()).try_init(),
                _ => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "Strata logging initialized"
                );
            }
        }
    });
}

/// Macro for conditional debug logging.
///
/// Only logs if `STRATA_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! strata_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional trace logging.
#[macro_export]
macro_rules! strata_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_values() {
        assert!(matches!(get_log_format(), "json" | "pretty" | "compact"));
    }

    #[test]
    fn test_log_level_values() {
        assert!(matches!(
            get_log_level(),
            "trace" | "debug" | "info" | "warn" | "error"
        ));
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }
}
