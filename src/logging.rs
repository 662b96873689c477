use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the defaults; audit
/// events are silenced unless audit logging is enabled.
pub fn init_tracing(audit: bool) {
    let default = if audit { "info" } else { "info,audit=off" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
