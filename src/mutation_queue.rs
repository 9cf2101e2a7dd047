//! Single worker that owns the scene and applies changes to it one at a time.
//!
//! Producers (SDK event delivery, frame callback, room flows) never touch the
//! scene. They send closures; the worker runs them in the order they were
//! sent.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::config::QueueConfig;
use crate::state::SceneState;

pub type Task = Box<dyn FnOnce(&mut SceneState) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("scene mutation worker has stopped")]
pub struct QueueClosed;

/// Why a task the caller waited on produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Closed(#[from] QueueClosed),
    #[error("scene task panicked: {0}")]
    Panicked(String),
}

enum Message {
    Mutation(Task),
    /// Barriers and reads; not counted as mutations.
    Sync(Task),
    Shutdown,
}

#[derive(Default)]
struct QueueStats {
    submitted: AtomicU64,
    executed: AtomicU64,
}

/// Cloneable handle for submitting work to the scene worker.
#[derive(Clone)]
pub struct MutationQueue {
    sender: Sender<Message>,
    stats: Arc<QueueStats>,
}

/// Owns the worker thread. Dropping it leaves the worker running until every
/// queue handle is gone.
pub struct QueueWorker {
    sender: Sender<Message>,
    handle: JoinHandle<SceneState>,
}

impl MutationQueue {
    pub fn spawn(config: &QueueConfig, state: SceneState) -> std::io::Result<(Self, QueueWorker)> {
        let (sender, receiver) = match config.capacity {
            Some(capacity) => crossbeam_channel::bounded(capacity),
            None => crossbeam_channel::unbounded(),
        };
        let stats = Arc::new(QueueStats::default());

        let worker_stats = Arc::clone(&stats);
        let handle = thread::Builder::new()
            .name("scene-mutations".to_string())
            .spawn(move || run_worker(receiver, state, worker_stats))?;

        log::debug!("Scene mutation worker started (capacity: {:?})", config.capacity);

        let queue = Self {
            sender: sender.clone(),
            stats,
        };
        Ok((queue, QueueWorker { sender, handle }))
    }

    /// Queues a mutation and returns without waiting for it. Blocks only
    /// when a bounded queue is full.
    pub fn submit<F>(&self, task: F) -> Result<(), QueueClosed>
    where
        F: FnOnce(&mut SceneState) + Send + 'static,
    {
        self.send(Message::Mutation(Box::new(task)))?;
        self.stats.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Like [`MutationQueue::submit`], but waits for the task and returns
    /// its result.
    pub fn call<R, F>(&self, f: F) -> Result<R, TaskError>
    where
        R: Send + 'static,
        F: FnOnce(&mut SceneState) -> R + Send + 'static,
    {
        let (reply, result) = crossbeam_channel::bounded(1);
        self.submit(move |state| {
            let _ = reply.send(guarded(|| f(state)));
        })?;
        result.recv().map_err(|_| QueueClosed)?.map_err(TaskError::Panicked)
    }

    /// Runs `f` after every task submitted so far and returns its result.
    pub fn read<R, F>(&self, f: F) -> Result<R, TaskError>
    where
        R: Send + 'static,
        F: FnOnce(&SceneState) -> R + Send + 'static,
    {
        let (reply, result) = crossbeam_channel::bounded(1);
        self.send(Message::Sync(Box::new(move |state: &mut SceneState| {
            let _ = reply.send(guarded(|| f(&*state)));
        })))?;
        result.recv().map_err(|_| QueueClosed)?.map_err(TaskError::Panicked)
    }

    /// Blocks until every task submitted before this call has run.
    pub fn drain(&self) -> Result<(), QueueClosed> {
        let (reply, done) = crossbeam_channel::bounded(1);
        self.send(Message::Sync(Box::new(move |_: &mut SceneState| {
            let _ = reply.send(());
        })))?;
        done.recv().map_err(|_| QueueClosed)
    }

    /// [`MutationQueue::drain`] for async callers.
    pub async fn drain_async(&self) -> Result<(), QueueClosed> {
        let (reply, done) = tokio::sync::oneshot::channel();
        self.send(Message::Sync(Box::new(move |_: &mut SceneState| {
            let _ = reply.send(());
        })))?;
        done.await.map_err(|_| QueueClosed)
    }

    pub fn submitted(&self) -> u64 {
        self.stats.submitted.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> u64 {
        self.stats.executed.load(Ordering::SeqCst)
    }

    fn send(&self, message: Message) -> Result<(), QueueClosed> {
        self.sender.send(message).map_err(|_| QueueClosed)
    }
}

impl QueueWorker {
    /// Lets the worker finish what is queued, stops it and hands back the
    /// scene. Tasks submitted after this call are discarded.
    pub fn shutdown(self) -> SceneState {
        // The worker may already be gone, in which case join reports why.
        let _ = self.sender.send(Message::Shutdown);
        drop(self.sender);
        match self.handle.join() {
            Ok(state) => state,
            Err(panic) => panic::resume_unwind(panic),
        }
    }
}

fn run_worker(
    receiver: Receiver<Message>,
    mut state: SceneState,
    stats: Arc<QueueStats>,
) -> SceneState {
    for message in receiver.iter() {
        match message {
            Message::Mutation(task) => {
                run_task(task, &mut state);
                stats.executed.fetch_add(1, Ordering::SeqCst);
            }
            Message::Sync(task) => run_task(task, &mut state),
            Message::Shutdown => break,
        }
    }

    log::debug!("Scene mutation worker stopped");
    state
}

fn run_task(task: Task, state: &mut SceneState) {
    let _ = guarded(|| task(state));
}

/// Runs `f`, turning a panic into its message so the worker can carry on.
fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|panic| {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("Scene mutation task panicked: {reason}");
        reason
    })
}
