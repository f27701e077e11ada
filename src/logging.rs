//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for the filter:
//! 1. `RUST_LOG` (any `EnvFilter` directive)
//! 2. the configured level (`SHOPFLOOR_LOG`)
//! 3. `info`, with a warning on stderr if the configured value is invalid

use tracing_subscriber::EnvFilter;

/// Builds the log filter from `RUST_LOG` or `level`.
pub fn build_filter(level: &str) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match level.parse::<EnvFilter>() {
            Ok(filter) => filter,
            Err(e) => {
                eprintln!(
                    "WARN: SHOPFLOOR_LOG='{level}' is not a valid tracing filter ({e}); \
                     falling back to 'info'"
                );
                EnvFilter::new("info")
            }
        },
    }
}

/// Initialise the global logging subscriber.
///
/// Call once at startup; a second call panics.
pub fn init_logging(level: &str, json: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(true)
        .with_thread_ids(false);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
