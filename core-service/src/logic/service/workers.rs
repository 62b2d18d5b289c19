//! Inference Worker Pool
//!
//! Fixed set of OS threads pulling boxed jobs from a bounded queue. The
//! queue bound is the only admission control: a full queue makes callers
//! wait for capacity instead of spawning more work.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::logic::error::ServiceError;

type Job = Box<dyn FnOnce() + Send + 'static>;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn inference worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker pool is shut down")]
    Closed,

    #[error("inference job was dropped before completing")]
    Dropped,

    #[error("inference job panicked: {0}")]
    Panicked(String),
}

impl From<PoolError> for ServiceError {
    fn from(err: PoolError) -> Self {
        ServiceError::Prediction(err.to_string())
    }
}

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub workers: usize,
    pub capacity: usize,
    /// Jobs waiting for a free worker
    pub queued: usize,
    /// Jobs currently executing
    pub busy: usize,
    /// Jobs accepted since start
    pub submitted: u64,
}

#[derive(Debug, Default)]
struct Counters {
    busy: AtomicUsize,
    submitted: AtomicU64,
}

// ============================================================================
// POOL
// ============================================================================

pub struct WorkerPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
    counters: Arc<Counters>,
    capacity: usize,
}

impl WorkerPool {
    /// Spawn `workers` threads behind a queue of `queue_depth` slots
    pub fn new(workers: usize, queue_depth: usize) -> Result<Self, PoolError> {
        let workers = workers.max(1);
        let capacity = queue_depth.max(1);

        let (sender, receiver) = mpsc::channel::<Job>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let receiver = receiver.clone();
            let counters = counters.clone();
            let handle = thread::Builder::new()
                .name(format!("predict-worker-{}", id))
                .spawn(move || worker_loop(id, receiver, counters))?;
            handles.push(handle);
        }

        log::info!("Started {} inference workers (queue depth {})", workers, capacity);

        Ok(Self {
            sender: Some(sender),
            workers: handles,
            counters,
            capacity,
        })
    }

    /// Run `f` on a worker and await its result.
    ///
    /// Suspends while the queue is full and while the job runs. A panic in
    /// `f` comes back as `PoolError::Panicked`; the worker survives it.
    pub async fn run<F, T>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolError::Closed)?;
        let (tx, rx) = oneshot::channel();

        let job: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| PoolError::Panicked(panic_message(payload.as_ref())));
            // receiver gone means the caller stopped waiting
            let _ = tx.send(result);
        });

        sender.send(job).await.map_err(|_| PoolError::Closed)?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        rx.await.map_err(|_| PoolError::Dropped)?
    }

    pub fn stats(&self) -> PoolStats {
        let queued = self
            .sender
            .as_ref()
            .map(|s| s.max_capacity() - s.capacity())
            .unwrap_or(0);

        PoolStats {
            workers: self.workers.len(),
            capacity: self.capacity,
            queued,
            busy: self.counters.busy.load(Ordering::Relaxed),
            submitted: self.counters.submitted.load(Ordering::Relaxed),
        }
    }

    /// Close the queue, let queued jobs finish, join every worker
    pub fn shutdown(mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::warn!("Inference worker exited abnormally");
            }
        }
        log::info!("Inference workers stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // closing the queue is enough; workers exit once it drains
        self.sender.take();
    }
}

fn worker_loop(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>, counters: Arc<Counters>) {
    log::debug!("Worker {} started", id);

    loop {
        let job = receiver.lock().blocking_recv();
        let Some(job) = job else {
            break;
        };

        counters.busy.fetch_add(1, Ordering::Relaxed);
        job();
        counters.busy.fetch_sub(1, Ordering::Relaxed);
    }

    log::debug!("Worker {} queue closed, exiting", id);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
