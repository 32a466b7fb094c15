//! Logging integration for hysteria.
//!
//! Provides a helper for installing a [`tracing`] subscriber and the single
//! [`log_query`] entry point every driver call goes through.

use std::fmt::Debug;

/// The tracing target statements are logged under.
pub const SQL_TARGET: &str = "hysteria::sql";

/// Sets up the global tracing subscriber.
///
/// `level` is an [`EnvFilter`](tracing_subscriber::EnvFilter) directive such
/// as `"info"` or `"hysteria::sql=info,warn"`. With `pretty` a human-readable
/// format is used; otherwise a structured JSON format is used. Installing a
/// second subscriber is a no-op.
pub fn setup_logging(level: &str, pretty: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if pretty {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Logs a statement about to be sent to the driver.
///
/// With `logs` on the statement is emitted at `info`, otherwise at `trace`.
pub fn log_query(logs: bool, sql: &str, params: &impl Debug) {
    if logs {
        tracing::info!(target: SQL_TARGET, sql, params = ?params, "executing query");
    } else {
        tracing::trace!(target: SQL_TARGET, sql, params = ?params, "executing query");
    }
}
