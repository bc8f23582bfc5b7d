//! Subscriber installation for binaries. Library code only emits events.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "warn";

/// Filter directives from `SPLICE_LOG`, then `RUST_LOG`, then `warn`.
///
/// `verbosity` raises the level for splice's own crates: one step to `info`,
/// two to `debug`, three or more to `trace`.
#[must_use]
pub fn directives(verbosity: u8) -> String {
    let base = env::var("SPLICE_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_owned());

    let level = match verbosity {
        0 => return base,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("{base},splice_core={level},splice_agents={level}")
}

/// Install a stderr `fmt` subscriber. Calling it twice is harmless.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_new(directives(verbosity))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
