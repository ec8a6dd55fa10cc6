//! tracing subscriber setup
//!
//! Registry events (`land_registry::*` targets) follow the configured level;
//! everything else is held at `warn` unless `RUST_LOG` says otherwise.

use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const CRATE_TARGET: &str = "land_registry";

/// Filter directives for a configured level.
///
/// A bare level (`debug`) is scoped to this crate. A value that already holds
/// directives (`info,land_registry::ledger=trace`) is used verbatim.
pub fn filter_directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.is_empty() {
        return format!("warn,{CRATE_TARGET}=info");
    }
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("warn,{CRATE_TARGET}={level}")
}

/// Install the global subscriber.
///
/// The returned guard owns the non-blocking file writer: hold it in `main`
/// until exit, otherwise buffered lines (including commit aborts logged at
/// the end of a scenario) never reach the log file.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        // plot_id / commit_id / caller fields land as JSON keys
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        // stdout carries scenario output, so the console layer goes to stderr
        let file_layer = fmt::layer()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        let console_layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(true);
        registry.with(file_layer).with(console_layer).init();
    }

    guard
}
