//! Tracing bootstrap shared by embedding binaries and integration tests.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Configure tracing subscribers so logs include spans by default.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
