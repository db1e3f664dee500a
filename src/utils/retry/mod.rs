//! Retry utilities: backoff builders and the retry loop for storage calls.
//!
//! Uses `backon` for exponential backoff with jitter. Only errors that
//! `StorageError::is_transient` accepts are retried.

use std::future::Future;

use backon::{BackoffBuilder, ExponentialBuilder};
use tracing::warn;

use crate::config::RetryConfig;
use crate::interfaces::StorageError;

/// Backoff for per-key storage retries, built from configuration.
pub fn storage_backoff(config: &RetryConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(config.min_delay())
        .with_max_delay(config.max_delay())
        .with_max_times(config.max_retries)
        .with_jitter()
}

/// Run `op` until it succeeds, fails permanently, or the backoff runs out.
///
/// `what` names the operation in logs (e.g. "put_menu_summary").
pub async fn retry_storage<T, F, Fut>(
    backoff: &ExponentialBuilder,
    what: &str,
    mut op: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut delays = backoff.clone().build();
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => match delays.next() {
                Some(delay) => {
                    warn!(
                        operation = %what,
                        attempt,
                        error = %e,
                        backoff_ms = %delay.as_millis(),
                        "Transient storage failure, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}
