use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` picks the filter (default
/// `info`); `JOBS_LOG_JSON=1` switches to JSON lines.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    // A subscriber already set by an embedding application wins.
    let _ = if std::env::var("JOBS_LOG_JSON").ok().as_deref() == Some("1") {
        fmt.json().try_init()
    } else {
        fmt.try_init()
    };
}
