use std::future::Future;
use std::time::Duration;

use crate::SwitchboardError;

/// Runs `future` with an upper bound of `limit`, mapping expiry to
/// [`SwitchboardError::Timeout`].
pub async fn with_timeout<F, T>(limit: Duration, future: F) -> Result<T, SwitchboardError>
where
    F: Future<Output = Result<T, SwitchboardError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(SwitchboardError::Timeout(limit)),
    }
}
