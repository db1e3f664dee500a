//! Bootstrap utilities for the sales-rollup binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the SALES_ROLLUP_LOG environment variable.
///
/// Defaults to "info" level if SALES_ROLLUP_LOG is not set. Logs go to
/// stderr so stdout stays free for machine-readable results.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
