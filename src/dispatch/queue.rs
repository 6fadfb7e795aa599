//! Dispatch Queue
//!
//! Bounded-concurrency executor for [`Task`]s. Tasks are admitted in FIFO
//! order while fewer than `concurrency_limit` of them hold a slot; each
//! admitted task checks the cache, then calls the transport, retrying
//! transient failures with the shared adaptive backoff.
//!
//! Completion order across concurrently dispatched tasks is not defined.
//! A caller that stops awaiting its result does not cancel the task.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::QueueConfig;
use crate::dispatch::state::QueueState;
use crate::error::QueryError;
use crate::task::Task;
use crate::transport::{Transport, TransportRequest};

/// Identifier attached to every enqueued task, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        TaskId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks waiting for a slot
    pub pending: usize,
    /// Tasks holding a slot
    pub active: usize,
    /// Tasks that finished successfully, cache hits included
    pub completed: u64,
    /// Tasks that finished with an error
    pub failed: u64,
    /// Retries issued after a transient failure
    pub retried: u64,
    /// Tasks answered from the cache
    pub cache_hits: u64,
    pub concurrency_limit: usize,
    pub max_concurrency: usize,
    pub delay: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    completed: u64,
    failed: u64,
    retried: u64,
    cache_hits: u64,
}

type Completion = oneshot::Sender<Result<Value, QueryError>>;

struct Job {
    id: TaskId,
    task: Task,
    enqueued_at: Instant,
    completion: Completion,
}

struct QueueInner {
    transport: Arc<dyn Transport>,
    cache: Arc<CacheStore>,
    // Lock order: state before backlog.
    state: Mutex<QueueState>,
    backlog: Mutex<VecDeque<Job>>,
    counters: RwLock<Counters>,
}

/// Cheap to clone; clones share one backlog and one feedback loop.
#[derive(Clone)]
pub struct DispatchQueue {
    inner: Arc<QueueInner>,
}

impl DispatchQueue {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<CacheStore>,
        config: &QueueConfig,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                transport,
                cache,
                state: Mutex::new(QueueState::new(config)),
                backlog: Mutex::new(VecDeque::new()),
                counters: RwLock::new(Counters::default()),
            }),
        }
    }

    /// Run `task` to completion: a cached result, a fresh result, or the last
    /// error once retries are exhausted.
    pub async fn enqueue(&self, task: Task) -> Result<Value, QueryError> {
        let (completion, receiver) = oneshot::channel();
        let id = TaskId::next();
        debug!(task_id = %id, method = %task.method, "Task enqueued");

        self.inner.backlog.lock().push_back(Job {
            id,
            task,
            enqueued_at: Instant::now(),
            completion,
        });
        QueueInner::pump(&self.inner);

        receiver.await.map_err(|_| QueryError::QueueClosed)?
    }

    /// Enqueue every task in order and collect results in submission order.
    pub async fn enqueue_all<I>(&self, tasks: I) -> Vec<Result<Value, QueryError>>
    where
        I: IntoIterator<Item = Task>,
    {
        futures::future::join_all(tasks.into_iter().map(|task| self.enqueue(task))).await
    }

    /// Reset the concurrency limit and its ceiling to `concurrency`.
    pub fn set_concurrency(&self, concurrency: usize) {
        {
            let mut state = self.inner.state.lock();
            state.set_concurrency(concurrency);
            info!(concurrency = state.concurrency_limit, "Queue concurrency set");
        }
        QueueInner::pump(&self.inner);
    }

    pub fn set_delay(&self, delay: Duration) {
        let mut state = self.inner.state.lock();
        state.set_delay(delay);
        info!(delay_ms = delay.as_millis() as u64, "Queue base delay set");
    }

    /// Applies to tasks that start dispatching after the call.
    pub fn set_max_retries(&self, max_retries: u32) {
        let mut state = self.inner.state.lock();
        state.set_max_retries(max_retries);
        info!(max_retries = state.max_retries, "Queue max retries set");
    }

    /// Snapshot of the adaptive state.
    pub fn state(&self) -> QueueState {
        self.inner.state.lock().clone()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state();
        let pending = self.inner.backlog.lock().len();
        let counters = self.inner.counters.read();
        QueueStats {
            pending,
            active: state.active,
            completed: counters.completed,
            failed: counters.failed,
            retried: counters.retried,
            cache_hits: counters.cache_hits,
            concurrency_limit: state.concurrency_limit,
            max_concurrency: state.max_concurrency,
            delay: state.delay,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.inner.cache
    }
}

/// Releases a slot when the job finishes, then admits waiting jobs.
struct Slot {
    inner: Arc<QueueInner>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock();
            state.active = state.active.saturating_sub(1);
        }
        QueueInner::pump(&self.inner);
    }
}

impl QueueInner {
    /// Admit backlog jobs while there is capacity.
    fn pump(inner: &Arc<Self>) {
        loop {
            let job = {
                let mut state = inner.state.lock();
                if !state.has_capacity() {
                    return;
                }
                let Some(job) = inner.backlog.lock().pop_front() else {
                    return;
                };
                state.active += 1;
                job
            };

            let slot = Slot {
                inner: Arc::clone(inner),
            };
            tokio::spawn(async move {
                let Job {
                    id,
                    task,
                    enqueued_at,
                    completion,
                } = job;
                debug!(
                    task_id = %id,
                    waited_ms = enqueued_at.elapsed().as_millis() as u64,
                    "Task admitted"
                );

                let result = slot.inner.run(id, &task).await;
                {
                    let mut counters = slot.inner.counters.write();
                    match &result {
                        Ok(_) => counters.completed += 1,
                        Err(_) => counters.failed += 1,
                    }
                }
                drop(slot);
                // Receiver may be gone; the task still ran to completion.
                let _ = completion.send(result);
            });
        }
    }

    async fn run(&self, id: TaskId, task: &Task) -> Result<Value, QueryError> {
        if let Some(cached) = self.cache.fetch(task) {
            self.counters.write().cache_hits += 1;
            debug!(task_id = %id, "Task served from cache");
            return Ok(cached);
        }

        // Callers resolve the effective mode; `None` is the endpoint default.
        let reasoning = task.options.reasoning.clone().unwrap_or_default();
        let request = TransportRequest::from_task(task, reasoning);
        let max_retries = self.state.lock().max_retries;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let start = Instant::now();
            let outcome = match self.transport.execute(&request).await {
                Ok(response) if response.is_success() => Ok(response.body),
                Ok(response) => Err(QueryError::Status {
                    status: response.status,
                    body: response.body_text(),
                }),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(body) => {
                    let (concurrency_limit, delay) = {
                        let mut state = self.state.lock();
                        state.record_success();
                        (state.concurrency_limit, state.delay)
                    };
                    debug!(
                        task_id = %id,
                        method = %task.method,
                        attempt,
                        duration_ms = start.elapsed().as_millis() as u64,
                        concurrency_limit,
                        delay_ms = delay.as_millis() as u64,
                        "Dispatch succeeded"
                    );

                    let body = normalize_empty_body(task, body);
                    self.cache.put(task, &body);
                    return Ok(body);
                }
                Err(error) if !error.is_retryable() => {
                    warn!(task_id = %id, attempt, error = %error, "Dispatch failed, not retryable");
                    return Err(error);
                }
                Err(error) => {
                    let (delay, concurrency_limit) = {
                        let mut state = self.state.lock();
                        let delay = state.record_failure();
                        (delay, state.concurrency_limit)
                    };

                    if attempt >= max_retries {
                        warn!(
                            task_id = %id,
                            method = %task.method,
                            attempts = attempt,
                            concurrency_limit,
                            error = %error,
                            "Dispatch failed, retries exhausted"
                        );
                        return Err(error);
                    }

                    self.counters.write().retried += 1;
                    warn!(
                        task_id = %id,
                        method = %task.method,
                        attempt,
                        max_retries,
                        concurrency_limit,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Dispatch attempt failed, backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// The endpoint signals "no content" with an empty object; callers that
/// asked for text get an empty string instead.
fn normalize_empty_body(task: &Task, body: Value) -> Value {
    let empty_object = body.as_object().map(|m| m.is_empty()).unwrap_or(false);
    if empty_object && task.options.wants_text() {
        Value::String(String::new())
    } else {
        body
    }
}
