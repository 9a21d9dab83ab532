//! Structured logging setup.
//!
//! Installs a `tracing` subscriber writing to stderr:
//! - `RUST_LOG` takes precedence when set
//! - otherwise the level follows the CLI verbosity
//! - JSON lines when `RUST_LOG_FORMAT=json`

use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity level.
///
/// `quiet` wins over any `-v` count.
pub fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "diarflow=error";
    }
    match verbosity {
        0 => "diarflow=warn",
        1 => "diarflow=info",
        2 => "diarflow=debug",
        _ => "diarflow=trace",
    }
}

/// Initialize the global tracing subscriber.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)));

    let is_json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .with_thread_names(verbosity >= 2);

    let installed = if is_json {
        subscriber.json().try_init().is_ok()
    } else {
        subscriber.try_init().is_ok()
    };
    if !installed {
        tracing::debug!("tracing subscriber already installed");
    }
}
