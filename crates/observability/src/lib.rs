//! Process-wide logging setup.

/// Initialize structured logging with the `info` default filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init("info");
}

/// Like [`init`], but with a caller-chosen default filter.
///
/// `RUST_LOG` still wins when set.
pub fn init_with_default(default_filter: &str) {
    tracing::init(default_filter);
}

/// Subscriber construction.
pub mod tracing;
