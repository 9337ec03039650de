//! Retry with exponential backoff, gated on connectivity.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use super::NetworkTracker;

/// Returned in place of an attempt while the tracker reports offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("NETWORK_OFFLINE: network is offline")]
pub struct NetworkOffline;

impl NetworkTracker {
    /// Run `op` up to `retries + 1` times, doubling `initial_delay` after each failure.
    ///
    /// An attempt made while offline fails with [`NetworkOffline`] without calling
    /// `op`, and still counts. The last error is returned unchanged.
    pub async fn request_with_retry<T, E, F, Fut>(&self, mut op: F, retries: u32, initial_delay: Duration) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<NetworkOffline> + Display,
    {
        let total = retries.saturating_add(1);
        let mut delay = initial_delay;
        let mut attempt: u32 = 1;

        loop {
            let result = if self.is_online() { op().await } else { Err(E::from(NetworkOffline)) };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            tracing::warn!(attempt, total, error = %err, "request attempt failed");

            if attempt >= total {
                return Err(err);
            }

            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
            attempt += 1;
        }
    }

    /// [`request_with_retry`](Self::request_with_retry) with the tracker's configured policy.
    pub async fn request_with_retry_default<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<NetworkOffline> + Display,
    {
        self.request_with_retry(op, self.retry_times(), self.retry_delay())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::network::NetworkType;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[derive(Debug, PartialEq, thiserror::Error)]
    enum TestError {
        #[error("offline")]
        Offline,
        #[error("failed #{0}")]
        Failed(u32),
    }

    impl From<NetworkOffline> for TestError {
        fn from(_: NetworkOffline) -> Self {
            TestError::Offline
        }
    }

    #[tokio::test]
    async fn test_backoff_doubles_and_returns_last_error() {
        let tracker = NetworkTracker::new(EventBus::new());
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let started = Instant::now();

        let result: Result<(), TestError> = tracker
            .request_with_retry(
                || {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Err(TestError::Failed(n)) }
                },
                2,
                Duration::from_millis(100),
            )
            .await;

        assert_eq!(result, Err(TestError::Failed(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_success_stops_retrying() {
        let tracker = NetworkTracker::new(EventBus::new());
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<u32, TestError> = tracker
            .request_with_retry(
                || {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { if n < 2 { Err(TestError::Failed(n)) } else { Ok(n) } }
                },
                5,
                Duration::from_millis(5),
            )
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_offline_consumes_attempts_without_calling_op() {
        let tracker = NetworkTracker::new(EventBus::new());
        tracker.update(NetworkType::None, false);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), TestError> = tracker
            .request_with_retry(
                || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                2,
                Duration::from_millis(5),
            )
            .await;

        assert_eq!(result, Err(TestError::Offline));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_coming_online_mid_retry() {
        let tracker = NetworkTracker::new(EventBus::new());
        tracker.update(NetworkType::None, false);

        let restore = tracker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            restore.update(NetworkType::Wifi, true);
        });

        let result: Result<&str, TestError> = tracker
            .request_with_retry(|| async { Ok("done") }, 3, Duration::from_millis(50))
            .await;

        assert_eq!(result, Ok("done"));
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let tracker = NetworkTracker::new(EventBus::new());
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), TestError> = tracker
            .request_with_retry(
                || {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Err(TestError::Failed(n)) }
                },
                0,
                Duration::from_secs(60),
            )
            .await;

        assert_eq!(result, Err(TestError::Failed(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_default_policy_comes_from_tracker() {
        let tracker = NetworkTracker::new(EventBus::new()).with_retry_policy(1, Duration::from_millis(5));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let _: Result<(), TestError> = tracker
            .request_with_retry_default(|| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(TestError::Failed(n)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
