//! Environment variable names used by this crate for convenient
//! configuration of sinks from services.
//!
//! These are purely helpers; sinks themselves never read the environment.

/// Human sink color mode: `auto`, `always` or `never`.
pub const CTXLOG_COLOR_ENV: &str = "CTXLOG_COLOR";

/// When set to any value, disables colors regardless of `CTXLOG_COLOR`.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Capacity of the buffered sink queue.
pub const CTXLOG_BUFFER_ENV: &str = "CTXLOG_BUFFER";

/// Number of records sent per batch by the buffered sink.
pub const CTXLOG_BATCH_SIZE_ENV: &str = "CTXLOG_BATCH_SIZE";

/// Idle flush interval of the buffered sink, in milliseconds.
pub const CTXLOG_FLUSH_INTERVAL_MS_ENV: &str = "CTXLOG_FLUSH_INTERVAL_MS";

/// Read an environment variable, treating unset and non-unicode as absent.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
