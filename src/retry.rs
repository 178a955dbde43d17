use std::time::Duration;

use eyre::{Result, eyre};
use log::debug;

/// Retry an async operation with exponential backoff
pub async fn retry<F, Fut, T>(max_attempts: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if attempt + 1 < max_attempts {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    debug!("Attempt {} failed: {e}, retrying in {delay:?}", attempt + 1);
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| eyre!("operation was never attempted")))
}
