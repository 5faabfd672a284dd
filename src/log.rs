use std::io;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `debug`)
pub const LOG_ENV: &str = "GITSWITCH_LOG";

/// Install the stderr subscriber. Defaults to warnings only so normal
/// interactive output stays clean.
pub fn install() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
