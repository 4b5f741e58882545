// Jaskier Shared Pattern — async_primitives
//! Generic one-shot and batch futures, plus a panic-isolating worker pool.
//!
//! These are the substrate every adapter builds on: a uniform way to run
//! something concurrently, wait on it with or without a timeout, and fan
//! out a bounded number of jobs without one panicking task taking down a
//! whole backend's connection pool.

use std::fmt;
use std::future::Future as StdFuture;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch, Mutex, Notify};

/// Errors produced by the async substrate itself, as opposed to errors
/// surfaced by the operation being run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AsyncError {
    #[error("operation timed out")]
    Timeout,
    #[error("async operation panicked: {0}")]
    Panic(String),
    #[error("operation was cancelled")]
    Cancelled,
}

struct Shared<T> {
    result: Mutex<Option<(T, Option<AsyncError>)>>,
    notify: Notify,
}

/// A one-shot carrier of an asynchronous outcome.
///
/// `Complete` is idempotent: the first caller to complete the future wins,
/// later calls are no-ops. `Wait` is safe to call from any number of
/// concurrent callers and is itself idempotent — it always returns the
/// frozen `(value, error)` tuple once one exists.
pub struct Future<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Default + Send + 'static> Future<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                result: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }

    /// Publish the outcome. A second call after the first is a no-op —
    /// the future's value is frozen at the first completion.
    pub async fn complete(&self, value: T, error: Option<AsyncError>) {
        let mut guard = self.shared.result.lock().await;
        if guard.is_some() {
            return;
        }
        *guard = Some((value, error));
        drop(guard);
        self.shared.notify.notify_waiters();
    }

    /// Block until the future is signalled, then return the frozen tuple.
    pub async fn wait(&self) -> (T, Option<AsyncError>) {
        loop {
            {
                let guard = self.shared.result.lock().await;
                if let Some(result) = guard.as_ref() {
                    return result.clone();
                }
            }
            self.shared.notify.notified().await;
        }
    }

    /// Wait up to `d` for completion. On timeout returns `(default,
    /// Timeout)` WITHOUT completing the future — a later `wait()` still
    /// observes the real outcome whenever it arrives.
    pub async fn wait_with_timeout(&self, d: Duration) -> (T, Option<AsyncError>) {
        match tokio::time::timeout(d, self.wait()).await {
            Ok(result) => result,
            Err(_) => (T::default(), Some(AsyncError::Timeout)),
        }
    }

    /// Lock-free-ish probe: never blocks on completion, only on the
    /// (uncontended, briefly-held) result lock.
    pub fn is_done(&self) -> bool {
        self.shared
            .result
            .try_lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

impl<T: Clone + Default + Send + 'static> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn `op` concurrently. A panic inside `op` is caught and converted to
/// `AsyncError::Panic`; the returned future is always signalled exactly
/// once, panic or not.
pub fn execute_async<T, F, Fut>(op: F) -> Future<T>
where
    T: Clone + Default + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: StdFuture<Output = (T, Option<AsyncError>)> + Send + 'static,
{
    let future = Future::new();
    let handed_back = future.clone();

    tokio::spawn(async move {
        let (tx, rx) = oneshot::channel();
        let join = tokio::spawn(async move {
            let outcome = op().await;
            let _ = tx.send(outcome);
        });

        match rx.await {
            Ok((value, err)) => {
                future.complete(value, err).await;
            }
            Err(_) => {
                // The inner task died without sending — either it panicked
                // or was aborted. Distinguish by polling the join handle.
                let panic_msg = match join.await {
                    Err(join_err) if join_err.is_panic() => panic_message(join_err),
                    _ => "async operation panicked: unknown cause".to_string(),
                };
                future
                    .complete(T::default(), Some(AsyncError::Panic(panic_msg)))
                    .await;
            }
        }
    });

    handed_back
}

fn panic_message(err: tokio::task::JoinError) -> String {
    let payload = err.into_panic();
    let msg = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    format!("async operation panicked: {msg}")
}

/// A vector of `Future<T>` plus an aggregate completion signal, fired once
/// every child has completed. Child ordering matches input ordering.
///
/// The aggregate signal is a `watch` channel rather than a bare `Notify`:
/// `Notify::notified()` only observes notifications sent after it was
/// constructed, so a naive "check condition, then await notified()" has a
/// lost-wakeup window between the check and the `notified()` call — a
/// `notify_waiters()` landing in that window is missed and the waiter
/// hangs forever. `watch::Receiver::changed()` has no such window: its
/// internal version counter is compared against the value observed at
/// `borrow()` time, so a send that races the check is still caught.
pub struct BatchFuture<T> {
    children: Vec<Future<T>>,
    done_rx: watch::Receiver<bool>,
}

impl<T: Clone + Default + Send + 'static> BatchFuture<T> {
    /// Wait for every child future, in whatever order they complete, and
    /// return `(values, errors)` of equal length, positionally matching
    /// the inputs.
    pub async fn wait_all(&self) -> (Vec<T>, Vec<Option<AsyncError>>) {
        let mut values = Vec::with_capacity(self.children.len());
        let mut errors = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let (v, e) = child.wait().await;
            values.push(v);
            errors.push(e);
        }
        (values, errors)
    }

    /// Resolves once every child has reached a terminal state.
    pub async fn wait_done(&self) {
        let mut rx = self.done_rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }
}

/// Start every operation in `ops` concurrently, each with its own panic
/// isolation; a supervisor task marks the batch done once every child is.
pub fn execute_batch_async<T, F, Fut>(ops: Vec<F>) -> BatchFuture<T>
where
    T: Clone + Default + Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: StdFuture<Output = (T, Option<AsyncError>)> + Send + 'static,
{
    let children: Vec<Future<T>> = ops.into_iter().map(execute_async).collect();
    let (done_tx, done_rx) = watch::channel(false);

    let supervisor_children = children.clone();
    tokio::spawn(async move {
        for child in &supervisor_children {
            child.wait().await;
        }
        let _ = done_tx.send(true);
    });

    BatchFuture { children, done_rx }
}

impl<T> Clone for BatchFuture<T> {
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
            done_rx: self.done_rx.clone(),
        }
    }
}

// ── WorkerPool ───────────────────────────────────────────────────────────

type Job = Box<dyn FnOnce() -> futures_util::future::BoxFuture<'static, ()> + Send>;

/// A bounded pool of `workers` tasks draining a job queue of capacity
/// `2 * workers`. Submission is non-blocking while the queue has room;
/// after `stop()`, new submissions are silently dropped, but anything
/// already queued still drains. Each worker recovers from a panicking job
/// without taking down the pool.
pub struct WorkerPool {
    workers: usize,
    sender: Mutex<Option<tokio::sync::mpsc::Sender<Job>>>,
    receiver: Arc<Mutex<Option<tokio::sync::mpsc::Receiver<Job>>>>,
    stopping: Arc<std::sync::atomic::AtomicBool>,
    handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Arc<Self> {
        assert!(workers > 0, "WorkerPool requires at least one worker");
        let capacity = workers * 2;
        let (sender, receiver) = tokio::sync::mpsc::channel(capacity);
        Arc::new(Self {
            workers,
            sender: Mutex::new(Some(sender)),
            receiver: Arc::new(Mutex::new(Some(receiver))),
            stopping: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Launch `workers` tasks, each pulling jobs off the shared queue.
    pub async fn start(self: &Arc<Self>) {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .expect("WorkerPool::start called more than once");
        let shared_receiver = Arc::new(Mutex::new(receiver));

        let mut handles = self.handles.lock().await;
        for id in 0..self.workers {
            let shared_receiver = Arc::clone(&shared_receiver);
            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = shared_receiver.lock().await;
                        guard.recv().await
                    };
                    let Some(job) = job else { break };
                    let fut = std::panic::AssertUnwindSafe(job());
                    if let Err(panic) = futures_util::FutureExt::catch_unwind(fut).await {
                        tracing::error!(worker = id, "worker job panicked: {:?}", panic_payload(panic));
                    }
                }
            }));
        }
    }

    /// Submit a job. Non-blocking while there is queue capacity; drops the
    /// job silently once the pool is stopping.
    pub async fn submit<F, Fut>(&self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: StdFuture<Output = ()> + Send + 'static,
    {
        if self.stopping.load(std::sync::atomic::Ordering::Acquire) {
            return;
        }
        let sender = {
            let guard = self.sender.lock().await;
            match guard.as_ref() {
                Some(s) => s.clone(),
                None => return,
            }
        };
        let boxed: Job = Box::new(move || Box::pin(job()));
        // A full queue briefly backpressures the caller rather than
        // blocking indefinitely — callers under shutdown still see the
        // stopping flag on their next attempt.
        let _ = tokio::time::timeout(Duration::from_millis(50), sender.send(boxed)).await;
    }

    /// Stop accepting new jobs. Already-queued jobs still drain.
    pub async fn stop(&self) {
        self.stopping.store(true, std::sync::atomic::Ordering::Release);
        // Dropping every stored sender closes the channel once in-flight
        // `submit` calls finish, letting workers drain the queue and exit.
        self.sender.lock().await.take();
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
    }

    /// `stop()` plus queue cleanup. Safe to call more than once.
    pub async fn close(&self) {
        self.stop().await;
    }
}

fn panic_payload(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn future_complete_is_idempotent() {
        let f: Future<u32> = Future::new();
        f.complete(1, None).await;
        f.complete(2, Some(AsyncError::Cancelled)).await;
        let (v, e) = f.wait().await;
        assert_eq!(v, 1);
        assert!(e.is_none());
    }

    #[tokio::test]
    async fn wait_with_timeout_does_not_consume_completion() {
        let f: Future<u32> = Future::new();
        let (v, e) = f.wait_with_timeout(Duration::from_millis(10)).await;
        assert_eq!(v, 0);
        assert!(matches!(e, Some(AsyncError::Timeout)));

        f.complete(42, None).await;
        let (v, e) = f.wait().await;
        assert_eq!(v, 42);
        assert!(e.is_none());
    }

    #[tokio::test]
    async fn is_done_never_blocks_before_completion() {
        let f: Future<u32> = Future::new();
        assert!(!f.is_done());
        f.complete(1, None).await;
        assert!(f.is_done());
    }

    #[tokio::test]
    async fn execute_async_isolates_panics() {
        let f = execute_async(|| async {
            panic!("boom");
            #[allow(unreachable_code)]
            (0u32, None)
        });
        let (v, e) = f.wait().await;
        assert_eq!(v, 0);
        assert!(matches!(e, Some(AsyncError::Panic(_))));
    }

    #[tokio::test]
    async fn batch_future_wait_done_resolves_after_all_children() {
        let ops: Vec<_> = (0..4)
            .map(|i| {
                move || async move {
                    tokio::time::sleep(Duration::from_millis(5 * i)).await;
                    (i, None)
                }
            })
            .collect();
        let batch = execute_batch_async(ops);
        batch.wait_done().await;
        assert!(batch.children.iter().all(|c| c.is_done()));
    }

    #[tokio::test]
    async fn batch_future_preserves_order_and_length() {
        let ops: Vec<_> = (0..5)
            .map(|i| move || async move { (i, None) })
            .collect();
        let batch = execute_batch_async(ops);
        let (values, errors) = batch.wait_all().await;
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().all(|e| e.is_none()));
    }

    #[tokio::test]
    async fn worker_pool_caps_concurrency() {
        let pool = WorkerPool::new(2);
        pool.start().await;
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let active = Arc::clone(&active);
            let max_seen = Arc::clone(&max_seen);
            pool.submit(move || async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            })
            .await;
        }

        pool.stop().await;
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn worker_pool_survives_job_panic() {
        let pool = WorkerPool::new(1);
        pool.start().await;
        pool.submit(|| async { panic!("job exploded") }).await;

        let done = Arc::new(AtomicUsize::new(0));
        let done2 = Arc::clone(&done);
        pool.submit(move || async move {
            done2.store(1, Ordering::SeqCst);
        })
        .await;

        pool.stop().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
