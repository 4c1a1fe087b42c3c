//! Cancelable bounded wait
//!
//! Races a unit of work against a deadline. Exactly one outcome is produced:
//! the work's own result, or a timeout carrying an optional state snapshot.
//! On timeout the cancel hook runs once and the work is released; whatever it
//! settles to afterwards is drained and logged, never surfaced.

use minecraft_mcp_core::McpError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Hook<T> = Box<dyn FnOnce() -> BoxFuture<T> + Send>;

/// Why a bounded wait did not produce a value
#[derive(Debug)]
pub enum WaitError<E, S = ()> {
    /// The work finished first, with an error
    Failed(E),
    /// The deadline passed first
    TimedOut {
        elapsed: Duration,
        snapshot: Option<S>,
    },
    /// The work was cancelled from outside (runtime shutdown)
    Aborted,
}

impl<E: fmt::Display, S> fmt::Display for WaitError<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Failed(e) => write!(f, "{}", e),
            WaitError::TimedOut { elapsed, .. } => {
                write!(f, "timed out after {}ms", elapsed.as_millis())
            }
            WaitError::Aborted => f.write_str("operation aborted"),
        }
    }
}

impl<S> From<WaitError<McpError, S>> for McpError {
    fn from(err: WaitError<McpError, S>) -> Self {
        match err {
            WaitError::Failed(e) => e,
            WaitError::TimedOut { elapsed, .. } => McpError::Timeout { elapsed },
            WaitError::Aborted => McpError::game("operation aborted"),
        }
    }
}

/// Releases the in-flight work unless it was already taken
struct InFlight<T>(Option<JoinHandle<T>>);

impl<T> InFlight<T> {
    fn take(&mut self) -> Option<JoinHandle<T>> {
        self.0.take()
    }
}

impl<T> Drop for InFlight<T> {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            task.abort();
        }
    }
}

/// A deadline with optional cancel and snapshot hooks
pub struct BoundedWait<S = ()> {
    limit: Option<Duration>,
    on_timeout: Option<Hook<()>>,
    snapshot: Option<Hook<Option<S>>>,
}

impl<S: Send + 'static> BoundedWait<S> {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit: Some(limit),
            on_timeout: None,
            snapshot: None,
        }
    }

    /// No deadline; the work's outcome is always returned
    pub fn unbounded() -> Self {
        Self {
            limit: None,
            on_timeout: None,
            snapshot: None,
        }
    }

    /// Called exactly once when the deadline wins
    pub fn on_timeout<F, Fut>(mut self, cancel: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_timeout = Some(Box::new(move || Box::pin(cancel())));
        self
    }

    /// Captures state to report alongside a timeout
    pub fn snapshot<F, Fut>(mut self, take: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Option<S>> + Send + 'static,
    {
        self.snapshot = Some(Box::new(move || Box::pin(take())));
        self
    }

    /// Run `work` against the deadline
    ///
    /// A panic inside `work` is resumed on the caller.
    pub async fn run<T, E, F>(self, work: F) -> Result<T, WaitError<E, S>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let start = Instant::now();
        let mut in_flight = InFlight(Some(tokio::spawn(work)));

        let joined = match (self.limit, in_flight.0.as_mut()) {
            (Some(limit), Some(task)) => tokio::time::timeout(limit, task).await.ok(),
            (None, Some(task)) => Some(task.await),
            (_, None) => None,
        };

        if let Some(joined) = joined {
            // Settled; nothing left for the guard to release
            in_flight.take();
            return match joined {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(WaitError::Failed(e)),
                Err(join) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
                Err(_) => Err(WaitError::Aborted),
            };
        }

        let elapsed = start.elapsed();
        debug!("Bounded wait expired after {}ms", elapsed.as_millis());

        if let Some(cancel) = self.on_timeout {
            cancel().await;
        }
        let snapshot = match self.snapshot {
            Some(take) => take().await,
            None => None,
        };

        if let Some(task) = in_flight.take() {
            task.abort();
            match task.await {
                Ok(Ok(_)) => debug!("Discarding result that settled after timeout"),
                Ok(Err(e)) => debug!("Discarding failure that settled after timeout: {}", e),
                Err(join) if join.is_cancelled() => debug!("Timed-out work released"),
                Err(_) => debug!("Timed-out work panicked while settling"),
            }
        }

        Err(WaitError::TimedOut { elapsed, snapshot })
    }
}
