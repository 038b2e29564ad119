//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (an `EnvFilter` directive such
/// as `warn` or `appmanifest=debug`) is used. Calling this twice is harmless.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

/// Level directive for a `-v` count, falling back to `configured`.
pub fn level_for_verbosity(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_owned(),
        1 => "info".into(),
        2 => "debug".into(),
        _ => "trace".into(),
    }
}
