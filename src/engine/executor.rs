// src/engine/executor.rs
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use crate::config::ExecutorConfig;
use crate::error::ThrottleError;

/// State shared by the workers of a single executor call
struct Shared<F, T, E> {
    cursor: AtomicUsize,
    tasks: Vec<Mutex<Option<F>>>,
    results: Vec<Mutex<Option<T>>>,
    failure: Mutex<Option<(usize, E)>>,
    panicked: Mutex<Option<usize>>,
    failed: AtomicBool,
}

impl<F, T, E> Shared<F, T, E> {
    fn new(tasks: Vec<F>) -> Self {
        let results = tasks.iter().map(|_| Mutex::new(None)).collect();

        Self {
            cursor: AtomicUsize::new(0),
            tasks: tasks.into_iter().map(|task| Mutex::new(Some(task))).collect(),
            results,
            failure: Mutex::new(None),
            panicked: Mutex::new(None),
            failed: AtomicBool::new(false),
        }
    }

    /// Reserve the next unstarted index, or `None` once the sequence is exhausted
    fn claim(&self) -> Option<usize> {
        let index = self.cursor.fetch_add(1, Ordering::AcqRel);
        (index < self.tasks.len()).then_some(index)
    }

    /// Record a task failure. Only the first call has any effect.
    fn record_failure(&self, index: usize, error: E) -> bool {
        let mut failure = self.failure.lock();
        if failure.is_some() {
            return false;
        }

        *failure = Some((index, error));
        self.failed.store(true, Ordering::Release);
        true
    }

    /// Record a task that never returned. Stops further claims like a failure.
    fn record_abandoned(&self, index: usize) {
        self.panicked.lock().get_or_insert(index);
        self.failed.store(true, Ordering::Release);
    }
}

/// Marks the claimed task as abandoned unless it returned normally.
///
/// Fires when the worker future is dropped mid-task, which is where a panic
/// inside the task ends up once tokio has caught it.
struct InFlight<'a, F, T, E> {
    shared: &'a Shared<F, T, E>,
    index: usize,
    returned: bool,
}

impl<F, T, E> Drop for InFlight<'_, F, T, E> {
    fn drop(&mut self) {
        if !self.returned {
            self.shared.record_abandoned(self.index);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Claim-and-run loop of a single slot
async fn worker<F, Fut, T, E>(id: usize, shared: Arc<Shared<F, T, E>>)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut completed = 0usize;

    loop {
        if shared.failed.load(Ordering::Acquire) {
            trace!("Worker {} stopping: a task has already failed", id);
            break;
        }

        let Some(index) = shared.claim() else {
            break;
        };

        let task = shared.tasks[index].lock().take();
        let Some(task) = task else {
            continue;
        };

        trace!("Worker {} starting task {}", id, index);

        let mut in_flight = InFlight { shared: &*shared, index, returned: false };
        let outcome = task().await;
        in_flight.returned = true;
        drop(in_flight);

        match outcome {
            Ok(value) => {
                *shared.results[index].lock() = Some(value);
                completed += 1;
            }
            Err(error) => {
                if shared.record_failure(index, error) {
                    debug!("Task {} failed on worker {}", index, id);
                } else {
                    trace!("Task {} failed after another failure was recorded", index);
                }
                break;
            }
        }
    }

    debug!("Worker {} finished after {} successful tasks", id, completed);
}

/// Run `tasks` with at most `limit` of them in flight at any instant.
///
/// Each task is a factory invoked exactly once by whichever worker claims it.
/// Results come back in input order regardless of completion order. The first
/// failing task (in completion order) decides the outcome; tasks that are
/// already running are awaited but not cancelled, and no further tasks are
/// started.
///
/// An empty task list resolves to an empty vector for any limit. A limit of
/// zero with a non-empty task list is rejected instead of hanging.
///
/// Workers are spawned onto the current tokio runtime. Dropping the returned
/// future aborts them.
pub async fn run<F, Fut, T, E>(limit: usize, tasks: Vec<F>) -> Result<Vec<T>, ThrottleError<E>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    if tasks.is_empty() {
        debug!("No tasks to execute");
        return Ok(Vec::new());
    }

    if limit == 0 {
        return Err(ThrottleError::InvalidConfiguration(format!(
            "concurrency limit must be at least 1 to run {} tasks",
            tasks.len()
        )));
    }

    let total = tasks.len();
    let workers = limit.min(total);
    debug!("Executing {} tasks on {} workers (limit {})", total, workers, limit);

    let shared = Arc::new(Shared::new(tasks));
    let mut join_set = JoinSet::new();
    for id in 0..workers {
        join_set.spawn(worker(id, Arc::clone(&shared)));
    }

    let mut panic_payload = None;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic().as_ref());
                warn!("Worker panicked: {}", message);
                panic_payload.get_or_insert(message);
            }
            Err(e) => warn!("Worker terminated abnormally: {}", e),
        }
    }

    if let Some((index, error)) = shared.failure.lock().take() {
        return Err(ThrottleError::Task { index, error });
    }

    if let Some(index) = *shared.panicked.lock() {
        return Err(ThrottleError::TaskPanicked {
            index,
            message: panic_payload.unwrap_or_else(|| "task did not complete".to_string()),
        });
    }

    let mut results = Vec::with_capacity(total);
    for (index, slot) in shared.results.iter().enumerate() {
        let Some(value) = slot.lock().take() else {
            return Err(ThrottleError::TaskPanicked {
                index,
                message: "no result was produced".to_string(),
            });
        };
        results.push(value);
    }

    Ok(results)
}

/// Reusable handle carrying a concurrency limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    limit: usize,
}

impl Throttle {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Build from the executor configuration, resolving the "auto" limit
    pub fn from_config(config: &ExecutorConfig) -> Self {
        let limit = config.resolved_limit();
        info!("Executor concurrency limit set to {}", limit);
        Self::new(limit)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// See [`run`].
    pub async fn run<F, Fut, T, E>(&self, tasks: Vec<F>) -> Result<Vec<T>, ThrottleError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        run(self.limit, tasks).await
    }
}
