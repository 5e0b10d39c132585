//! Fixed-backoff retry decorator for transient transport errors

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{Depth, RemoteDirectory, RemoteError};
use crate::domain::StatModel;

/// Wait between retries of a service-unavailable response.
pub const SERVICE_UNAVAILABLE_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Wraps a remote and retries transient failures without bound, with a
/// fixed pause between attempts. Every other error passes through.
pub struct RetryingRemote<R> {
    inner: R,
    retry_delay: Duration,
}

impl<R> RetryingRemote<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            retry_delay: SERVICE_UNAVAILABLE_RETRY_DELAY,
        }
    }

    pub fn with_delay(inner: R, retry_delay: Duration) -> Self {
        Self { inner, retry_delay }
    }
}

#[async_trait]
impl<R: RemoteDirectory> RemoteDirectory for RetryingRemote<R> {
    async fn propfind(&self, path: &str, depth: Depth) -> Result<Vec<StatModel>, RemoteError> {
        loop {
            match self.inner.propfind(path, depth).await {
                Err(err) if err.is_transient() => {
                    warn!(
                        path,
                        delay_secs = self.retry_delay.as_secs(),
                        error = %err,
                        "remote temporarily unavailable, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyRemote {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteDirectory for FlakyRemote {
        async fn propfind(
            &self,
            path: &str,
            _depth: Depth,
        ) -> Result<Vec<StatModel>, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(RemoteError::ServiceUnavailable("503".into()));
            }
            Ok(vec![StatModel::new(path, true, 100, 0)])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_service_unavailable_until_success() {
        let remote = RetryingRemote::new(FlakyRemote {
            failures_left: AtomicUsize::new(2),
            calls: AtomicUsize::new(0),
        });
        let stats = remote.propfind("/base", Depth::Zero).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(remote.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_pass_through() {
        struct Broken;
        #[async_trait]
        impl RemoteDirectory for Broken {
            async fn propfind(
                &self,
                _path: &str,
                _depth: Depth,
            ) -> Result<Vec<StatModel>, RemoteError> {
                Err(RemoteError::Transport("connection reset".into()))
            }
        }
        let remote = RetryingRemote::new(Broken);
        let err = remote.propfind("/base", Depth::Zero).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
