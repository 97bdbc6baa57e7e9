// src/matching/pool.rs
//! Fixed-size pool of OS threads for CPU-bound scoring.
//!
//! Tasks are moved in by value and results come back through a oneshot, so
//! workers share no mutable state. A panicking task is caught and reported as
//! `PoolError::WorkerPanicked`; the worker thread itself keeps serving.

use crate::error::PoolError;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    tx: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

/// Awaitable result of one submitted task.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, PoolError>>,
}

impl<T> TaskHandle<T> {
    pub async fn join(self) -> Result<T, PoolError> {
        self.rx.await.unwrap_or(Err(PoolError::PoolClosed))
    }
}

fn panic_message(p: &(dyn Any + Send)) -> String {
    if let Some(s) = p.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = p.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Available cores, at least 1.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl WorkerPool {
    /// `size == 0` means one worker per available core.
    pub fn new(size: usize) -> io::Result<Self> {
        let size = if size == 0 { default_workers() } else { size };
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let rx = Arc::clone(&rx);
            let handle = thread::Builder::new()
                .name(format!("match-worker-{i}"))
                .spawn(move || loop {
                    let job = {
                        let guard = match rx.lock() {
                            Ok(g) => g,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        guard.recv()
                    };
                    match job {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                })?;
            workers.push(handle);
        }

        Ok(Self {
            tx: Some(tx),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn submit<T, F>(&self, f: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let res = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|p| PoolError::WorkerPanicked(panic_message(&*p)));
            let _ = reply.send(res);
        });
        // A failed send drops `reply`, which the handle reports as PoolClosed.
        if let Some(tx) = &self.tx {
            let _ = tx.send(job);
        }
        TaskHandle { rx }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.tx.take());
        for w in self.workers.drain(..) {
            let _ = w.join();
        }
    }
}
