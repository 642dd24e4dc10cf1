//! Logging setup for applications embedding the client.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `RUST_LOG` directives if they parse, otherwise `default_filter`.
fn select_filter(from_env: Option<String>, default_filter: &str) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns false if a
/// subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = select_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), default_filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
