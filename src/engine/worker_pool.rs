// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fixed-size pool of OS threads that runs queued executions.
//!
//! Process backends are synchronous and may block for a long time (reading a
//! coverage, waiting on a remote service), so queued executions run on
//! dedicated threads rather than on an async runtime. Threads are named
//! `process-worker-N` and pull jobs from a shared [`FairWorkQueue`].
//!
//! A job that panics is caught with `catch_unwind`; the worker logs it and
//! keeps serving. Only queued executions ever reach this pool. Chained
//! executions run on their caller's thread, which is what keeps nested
//! submissions from deadlocking a saturated pool.

use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::execution::{ExecutionId, Priority};
use crate::engine::priority_work_queue::FairWorkQueue;
use crate::errors::{ProcessError, ProcessResult};
use crate::observability::messages::pool::{WorkerJobPanicked, WorkerPoolStarted, WorkerPoolStopped};
use crate::observability::messages::StructuredLog;

pub type JobFn = Box<dyn FnOnce() + Send + 'static>;

struct Job {
    id: ExecutionId,
    run: JobFn,
}

struct PoolState {
    queue: FairWorkQueue<Job>,
    shutdown: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    available: Condvar,
}

pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `worker_threads` threads sharing a queue of at most `max_queued`
    /// pending jobs.
    pub fn new(worker_threads: usize, max_queued: usize, foreground_weight: u32) -> ProcessResult<Self> {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                queue: FairWorkQueue::new(max_queued, foreground_weight),
                shutdown: false,
            }),
            available: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(worker_threads);
        for index in 0..worker_threads {
            let shared_for_worker = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("process-worker-{index}"))
                .spawn(move || worker_loop(shared_for_worker));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // Release the threads that did start before reporting
                    shared.state.lock().shutdown = true;
                    shared.available.notify_all();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(ProcessError::Spawn(err));
                }
            }
        }

        WorkerPoolStarted {
            workers: worker_threads,
            max_queued,
            foreground_weight,
        }
        .log();

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            size: worker_threads,
        })
    }

    /// Enqueue a job. Fails with `Overloaded` when the queue is at capacity
    /// and with `ShuttingDown` once [`WorkerPool::shutdown`] has begun.
    pub fn submit(&self, id: ExecutionId, priority: Priority, run: JobFn) -> ProcessResult<()> {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return Err(ProcessError::ShuttingDown);
        }
        state
            .queue
            .push(priority, Job { id, run })
            .map_err(|full| ProcessError::Overloaded {
                priority,
                queued: full.queued,
            })?;
        drop(state);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Drop a job that no worker has picked up yet.
    pub fn remove(&self, id: &ExecutionId) -> bool {
        self.shared
            .state
            .lock()
            .queue
            .remove_first(|job| &job.id == id)
            .is_some()
    }

    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn queued_of(&self, priority: Priority) -> usize {
        self.shared.state.lock().queue.len_of(priority)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.state.lock().shutdown
    }

    /// Stop accepting work, discard pending jobs and wait for running jobs to
    /// return. Returns the ids of the discarded jobs.
    ///
    /// Safe to call from a pool thread; that thread is not joined.
    pub fn shutdown(&self) -> Vec<ExecutionId> {
        let drained: Vec<ExecutionId> = {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return Vec::new();
            }
            state.shutdown = true;
            state.queue.drain().into_iter().map(|job| job.id).collect()
        };
        self.shared.available.notify_all();

        let current = thread::current().id();
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        let joined = handles.len();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }

        WorkerPoolStopped {
            workers: joined,
            drained: drained.len(),
        }
        .log();

        drained
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if let Some((_, job)) = state.queue.pop() {
                    break job;
                }
                if state.shutdown {
                    return;
                }
                shared.available.wait(&mut state);
            }
        };

        let Job { id, run } = job;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(run)) {
            let worker = thread::current();
            WorkerJobPanicked {
                worker: worker.name().unwrap_or("process-worker"),
                execution_id: &id.to_string(),
                message: &panic_message(payload.as_ref()),
            }
            .log();
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
