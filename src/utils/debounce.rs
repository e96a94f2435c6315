// src/utils/debounce.rs
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

struct Inner<A> {
    callback: Arc<dyn Fn(A) + Send + Sync>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// A callback that only fires once calls have stopped for `delay`.
///
/// Each [`call`](Debounced::call) replaces any pending invocation, so the
/// callback receives the argument of the most recent call. Clones share the
/// same pending timer.
pub struct Debounced<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for Debounced<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Wrap `callback` so that bursts of calls collapse into a single invocation.
///
/// Must be called from within a tokio runtime.
pub fn debounce<A, F>(callback: F, delay: Duration) -> Debounced<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Debounced {
        inner: Arc::new(Inner {
            callback: Arc::new(callback),
            delay,
            pending: Mutex::new(None),
        }),
    }
}

impl<A: Send + 'static> Debounced<A> {
    /// Restart the timer; `arg` is handed to the callback if no other call follows
    pub fn call(&self, arg: A) {
        let callback = Arc::clone(&self.inner.callback);
        let delay = self.inner.delay;

        let mut pending = self.inner.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
            trace!("Debounced call superseded a pending invocation");
        }

        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback(arg);
        }));
    }

    /// Drop the pending invocation, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.inner.pending.lock().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner
            .pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
