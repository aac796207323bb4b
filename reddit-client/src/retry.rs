use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

/// Retry `op` a bounded number of times with a fixed delay after every
/// failed attempt. Returns `None` once the attempts are exhausted; the
/// caller decides how to degrade.
pub(crate) async fn bounded<T, E, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Some(value),
            Err(error) => {
                debug!("Attempt {}/{} failed: {}", attempt, attempts, error);
                sleep(delay).await;
            }
        }
    }

    None
}
