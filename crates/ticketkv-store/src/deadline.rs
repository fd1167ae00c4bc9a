//! Per-call deadlines for backend round trips.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Deadline applied to each backend call unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Await `fut`, failing with [`StoreError::Timeout`] once `timeout` elapses.
pub async fn within<T, F>(operation: &'static str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_call() {
        let err = within("slow", Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::Timeout { operation: "slow", after_ms: 5 }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let value = within("fast", DEFAULT_TIMEOUT, async { Ok::<_, StoreError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
