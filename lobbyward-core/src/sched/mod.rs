//! Scheduled tasks keyed by the entity that owns them.
//!
//! Every deadline in the system is a task owned by exactly one entity: a
//! pool's display refresh, an event's start, a verification window. Keying
//! tasks by the owning id makes entity deletion and timer cancellation a
//! single step, and makes `cancel` idempotent: cancelling a task that has
//! already fired or was already cancelled is a no-op.

use crate::types::{ChannelId, EventId, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Identity of a scheduled task: the entity that owns it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    /// Recurring display refresh for a channel's rent pool
    PoolRefresh(ChannelId),
    /// One-shot activation at an event's start instant
    EventStart(EventId),
    /// One-shot verification deadline for a joining member
    VerifyDeadline(UserId),
}

struct TaskEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    tasks: Mutex<HashMap<TaskKey, TaskEntry>>,
    generation: AtomicU64,
}

impl Inner {
    /// Remove the entry for `key` only if it still belongs to `generation`.
    ///
    /// A finished task must not evict a newer task scheduled under the
    /// same key in the meantime.
    fn unregister(&self, key: &TaskKey, generation: u64) {
        let mut tasks = self.tasks.lock().expect("scheduler lock poisoned");
        if tasks.get(key).map(|e| e.generation) == Some(generation) {
            tasks.remove(key);
        }
    }
}

/// Registry of one-shot and repeating tokio tasks keyed by [`TaskKey`]
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<Inner>,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Arm a one-shot task firing after `delay`.
    ///
    /// Replaces (and cancels) any task already scheduled under the same key.
    /// The entry unregisters itself once the job completes.
    pub fn schedule_once<F, Fut>(&self, key: TaskKey, delay: Duration, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();

        let mut tasks = self.inner.tasks.lock().expect("scheduler lock poisoned");
        if let Some(previous) = tasks.remove(&key) {
            previous.handle.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job().await;
            inner.unregister(&task_key, generation);
        });
        tasks.insert(key, TaskEntry { generation, handle });
    }

    /// Arm a repeating task with the given period.
    ///
    /// The first run happens one period after scheduling. The job stops the
    /// task (and unregisters it) by returning [`ControlFlow::Break`], which
    /// lets a job tear itself down without aborting its own handle.
    pub fn schedule_repeating<F, Fut>(&self, key: TaskKey, period: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send,
    {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();

        let mut tasks = self.inner.tasks.lock().expect("scheduler lock poisoned");
        if let Some(previous) = tasks.remove(&key) {
            previous.handle.abort();
        }
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if job().await.is_break() {
                    break;
                }
            }
            inner.unregister(&task_key, generation);
        });
        tasks.insert(key, TaskEntry { generation, handle });
    }

    /// Cancel the task owned by `key`. Idempotent; never panics if the task
    /// already fired or was never scheduled.
    pub fn cancel(&self, key: &TaskKey) {
        let mut tasks = self.inner.tasks.lock().expect("scheduler lock poisoned");
        if let Some(entry) = tasks.remove(key) {
            entry.handle.abort();
        }
    }

    /// Cancel every outstanding task
    pub fn cancel_all(&self) {
        let mut tasks = self.inner.tasks.lock().expect("scheduler lock poisoned");
        for (_, entry) in tasks.drain() {
            entry.handle.abort();
        }
    }

    /// Whether a task is currently registered under `key`
    pub fn is_scheduled(&self, key: &TaskKey) -> bool {
        self.inner
            .tasks
            .lock()
            .expect("scheduler lock poisoned")
            .contains_key(key)
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.inner.tasks.lock().expect("scheduler lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
