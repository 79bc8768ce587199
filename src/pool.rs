//! Bounded worker pool
//!
//! Fixed set of named threads draining a bounded crossbeam queue. I/O
//! threads hand work here so they never block on application code.
//!
//! - `submit` blocks while the queue is full
//! - `try_submit` fails fast with `PoolExhausted`

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Sender, TrySendError};
use parking_lot::Mutex;

use crate::error::{Result, RpcError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of worker threads
pub struct WorkerPool {
    name: String,

    /// Queue sender; `None` once shutdown has begun
    sender: Mutex<Option<Sender<Job>>>,

    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `threads` workers sharing a queue of `queue_capacity` jobs
    pub fn new(name: &str, threads: usize, queue_capacity: usize) -> Result<Self> {
        if threads == 0 {
            return Err(RpcError::Config(format!(
                "Pool {} needs at least one thread",
                name
            )));
        }

        let (sender, receiver) = channel::bounded::<Job>(queue_capacity);
        let mut workers = Vec::with_capacity(threads);

        for i in 0..threads {
            let receiver = receiver.clone();
            let pool_name = name.to_string();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, i))
                .spawn(move || {
                    // Ends when every sender is gone and the queue is drained
                    for job in receiver.iter() {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::error!("Job panicked in pool {}", pool_name);
                        }
                    }
                })?;
            workers.push(handle);
        }

        tracing::debug!("Started pool {} with {} threads", name, threads);

        Ok(Self {
            name: name.to_string(),
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    fn sender(&self) -> Result<Sender<Job>> {
        self.sender
            .lock()
            .clone()
            .ok_or_else(|| RpcError::Shutdown(format!("pool {} is shut down", self.name)))
    }

    /// Queue a job, waiting for space if the queue is full
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender()?
            .send(Box::new(job))
            .map_err(|_| RpcError::Shutdown(format!("pool {} is shut down", self.name)))
    }

    /// Queue a job only if there is room right now
    pub fn try_submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match self.sender()?.try_send(Box::new(job)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(RpcError::PoolExhausted(self.name.clone())),
            Err(TrySendError::Disconnected(_)) => Err(RpcError::Shutdown(format!(
                "pool {} is shut down",
                self.name
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop accepting work and wait up to `grace` for queued jobs to finish
    ///
    /// Workers still busy after the grace period are left to finish on
    /// their own.
    pub fn shutdown(&self, grace: Duration) -> Result<()> {
        drop(self.sender.lock().take());

        let deadline = Instant::now() + grace;
        let mut workers = std::mem::take(&mut *self.workers.lock());

        loop {
            let (finished, running): (Vec<_>, Vec<_>) =
                workers.into_iter().partition(|h| h.is_finished());
            for handle in finished {
                if handle.join().is_err() {
                    tracing::warn!("Worker in pool {} exited abnormally", self.name);
                }
            }
            if running.is_empty() {
                tracing::debug!("Pool {} shut down", self.name);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(RpcError::Shutdown(format!(
                    "pool {}: {} workers still busy after {:?}",
                    self.name,
                    running.len(),
                    grace
                )));
            }
            workers = running;
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Detach workers; they exit once the queue drains
        drop(self.sender.lock().take());
    }
}
