//! JSON tracing subscriber.

use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to `default_filter`.
pub fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(default_filter: &str) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(default_filter))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init()
        .is_ok();

    if installed {
        ::tracing::debug!(default_filter, "tracing initialized");
    }
    installed
}
