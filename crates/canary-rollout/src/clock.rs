//! Injectable sleeping and cooperative cancellation.

use std::future::Future;
use std::time::Duration;

use canary_core::{FleetResult, RolloutError, RolloutResult};
use tokio::sync::watch;

/// Suspends the rollout between stability polls.
///
/// Production uses [`TokioSleeper`]; tests substitute an instant one.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run-scoped cancellation handle.
///
/// Wraps the receiving side of a `watch::channel(false)`; sending `true`
/// cancels. A dropped sender means the run can no longer be cancelled.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// Create a handle together with the sender that triggers it.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// A handle that is never cancelled.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Drive a control-plane call, abandoning it if the run is cancelled.
    ///
    /// Cancellation wins ties, so nothing is issued once it is requested.
    pub async fn guard<T, F>(&self, call: F) -> RolloutResult<T>
    where
        F: Future<Output = FleetResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(RolloutError::Cancelled),
            result = call => result.map_err(RolloutError::from),
        }
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn sleep<S: Sleeper>(&self, sleeper: &S, duration: Duration) -> RolloutResult<()> {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(RolloutError::Cancelled),
            _ = sleeper.sleep(duration) => Ok(()),
        }
    }
}
