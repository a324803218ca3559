// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The execution manager: chained (inline) and queued (pooled) process runs.
//!
//! # Execution Modes
//!
//! * **Chained** ([`ExecutionManager::submit_chained`]) runs the backend on the
//!   calling thread and returns its outputs directly. It is meant for
//!   processes computed as inputs of other processes. A chained execution
//!   never occupies a pool thread: with a pool of `n` threads and `n` queued
//!   executions that each chain a sub-process, routing the sub-processes
//!   through the pool would leave every thread waiting for a slot that never
//!   frees up.
//! * **Queued** ([`ExecutionManager::submit`]) registers the execution, captures
//!   the caller's context and hands a job to the [`WorkerPool`]. The caller
//!   gets an [`ExecutionId`] back immediately and later collects the outcome
//!   with [`ExecutionManager::get_output`], exactly once.
//!
//! # Failure Handling
//!
//! Chained failures propagate to the caller as they happen. Queued failures,
//! including panics inside a backend, are recorded on the execution and only
//! surface through `get_output`; the worker thread moves on to its next job.
//!
//! # Cancellation
//!
//! A queued execution that has not started is cancelled outright and never
//! runs. A running one only has its cancellation token raised; the backend is
//! expected to notice through its [`ProcessMonitor`] and stop. Outputs
//! returned after cancellation was requested are discarded.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use geoproc_executor::backends::local::LocalBackend;
//! use geoproc_executor::catalog::ProcessCatalog;
//! use geoproc_executor::engine::{ExecutionManager, NullProgressListener, ParameterMap};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = ProcessCatalog::new().with_backend(Arc::new(LocalBackend::with_builtin("geo")))?;
//! let manager = ExecutionManager::builder(catalog).worker_threads(2).build()?;
//!
//! let inputs = ParameterMap::from([("values".to_string(), json!([1, 2, 3]))]);
//! let id = manager.submit("geo:sum", inputs, Arc::new(NullProgressListener), false)?;
//! let outputs = manager.get_output(&id, Duration::from_secs(5))?;
//! assert_eq!(outputs["sum"], json!(6.0));
//!
//! // The outcome is handed out once
//! assert!(manager.get_output(&id, Duration::ZERO).is_err());
//! manager.shutdown();
//! # Ok(())
//! # }
//! ```

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::catalog::ProcessCatalog;
use crate::config::consts::{
    DEFAULT_ABANDONED_AFTER_SECS, DEFAULT_FOREGROUND_WEIGHT, DEFAULT_MAX_QUEUED,
    DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_WORKER_THREADS_FALLBACK,
};
use crate::context::{self, ContextSnapshot};
use crate::engine::execution::{
    ExecutionId, ExecutionMode, ExecutionSnapshot, ExecutionStatus, ParameterMap, Priority,
    ProcessName,
};
use crate::engine::progress::{ProcessMonitor, ProgressListener};
use crate::engine::registry::{ExecutionEntry, ExecutionRegistry};
use crate::engine::worker_pool::{panic_message, WorkerPool};
use crate::errors::{BackendError, ProcessError, ProcessResult};
use crate::observability::messages::execution::{
    ExecutionCancelled, ExecutionConsumed, ExecutionFailed, ExecutionRejected, ExecutionStarted,
    ExecutionSubmitted, ExecutionSucceeded, ExecutionsReclaimed,
};
use crate::observability::messages::StructuredLog;
use crate::resources::NoopResourceManager;
use crate::traits::{ProcessBackend, ProcessRequest, ResourceManager};

/// When and how often settled-but-unread executions are reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reclamation {
    pub abandoned_after: Duration,
    pub sweep_interval: Duration,
}

impl Default for Reclamation {
    fn default() -> Self {
        Self {
            abandoned_after: Duration::from_secs(DEFAULT_ABANDONED_AFTER_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

/// One-way stop flag the sweeper can sleep on.
#[derive(Default)]
struct ShutdownSignal {
    stopped: Mutex<bool>,
    changed: Condvar,
}

impl ShutdownSignal {
    /// Returns `true` for the call that actually flipped the flag.
    fn trigger(&self) -> bool {
        let mut stopped = self.stopped.lock();
        if *stopped {
            return false;
        }
        *stopped = true;
        drop(stopped);
        self.changed.notify_all();
        true
    }

    fn is_triggered(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep up to `timeout`; `true` if the flag was raised meanwhile.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.changed.wait_for(&mut stopped, timeout);
        }
        *stopped
    }
}

struct ManagerInner {
    catalog: ProcessCatalog,
    registry: Arc<ExecutionRegistry>,
    pool: WorkerPool,
    signal: Arc<ShutdownSignal>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ManagerInner {
    fn shutdown(&self) {
        if !self.signal.trigger() {
            return;
        }

        for id in self.registry.ids() {
            if let Ok(entry) = self.registry.get(&id) {
                if !cancel_queued(&self.registry, &entry) {
                    entry.cancel.cancel();
                }
            }
        }

        // Anything that slipped into the queue after the sweep above
        for id in self.pool.shutdown() {
            if let Ok(entry) = self.registry.get(&id) {
                cancel_queued(&self.registry, &entry);
            }
        }

        if let Some(sweeper) = self.sweeper.lock().take() {
            if sweeper.thread().id() != thread::current().id() {
                let _ = sweeper.join();
            }
        }
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// `Queued -> Cancelled` plus the bookkeeping that goes with it.
fn cancel_queued(registry: &ExecutionRegistry, entry: &ExecutionEntry) -> bool {
    let resources = registry.resources();
    let cancelled = entry
        .channel
        .cancel_if_queued_then(|| resources.on_terminal(&entry.id, ExecutionStatus::Cancelled));
    if !cancelled {
        return false;
    }
    ExecutionCancelled {
        execution_id: &entry.id.to_string(),
        process: &entry.process_name.to_string(),
        while_queued: true,
    }
    .log();
    true
}

/// Cheap to clone; all clones drive the same pool and registry.
#[derive(Clone)]
pub struct ExecutionManager {
    inner: Arc<ManagerInner>,
}

impl ExecutionManager {
    pub fn builder(catalog: ProcessCatalog) -> ExecutionManagerBuilder {
        ExecutionManagerBuilder::new(catalog)
    }

    /// Run `process` to completion on the calling thread.
    ///
    /// When called from inside a running execution the nested run shares that
    /// execution's id, so resources it allocates are released with the
    /// enclosing execution.
    pub fn submit_chained(
        &self,
        process: impl Into<ProcessName>,
        inputs: ParameterMap,
        listener: Arc<dyn ProgressListener>,
    ) -> ProcessResult<ParameterMap> {
        if self.inner.signal.is_triggered() {
            return Err(ProcessError::ShuttingDown);
        }
        let monitor = ProcessMonitor::chained(CancellationToken::new(), listener);
        self.run_nested(process.into(), inputs, monitor)
    }

    pub(crate) fn run_nested(
        &self,
        process: ProcessName,
        inputs: ParameterMap,
        monitor: ProcessMonitor,
    ) -> ProcessResult<ParameterMap> {
        let backend = self.inner.catalog.resolve(&process)?;

        let ambient = context::capture();
        let (id, snapshot, transient) = match ambient.execution_id().cloned() {
            Some(id) => (id, ambient, false),
            None => {
                let id = ExecutionId::new();
                (id.clone(), ambient.with_execution_id(id), true)
            }
        };

        let resources = Arc::clone(self.inner.registry.resources());
        let _release = TransientResources {
            resources: resources.as_ref(),
            id: transient.then(|| id.clone()),
        };
        let _context = snapshot.apply();

        let id_label = id.to_string();
        let process_label = process.to_string();
        let started_msg = ExecutionStarted {
            execution_id: &id_label,
            process: &process_label,
            backend: backend.name(),
        };
        let span = started_msg.span("chained_execution");
        let _span = span.enter();
        started_msg.log();

        let listener = Arc::clone(monitor.listener());
        listener.started();

        let request = ProcessRequest::new(id.clone(), process, inputs, monitor.clone(), self.clone());
        let result = backend.run_chained(&request);
        drop(request);

        match result {
            Ok(outputs) if !monitor.is_cancelled() => {
                listener.completed();
                Ok(outputs)
            }
            Err(BackendError::Failed(source)) if !monitor.is_cancelled() => {
                let err = ProcessError::BackendFailure {
                    process: process_label,
                    source,
                };
                listener.failed(&err);
                Err(err)
            }
            _ => Err(ProcessError::Cancelled { id: id_label }),
        }
    }

    /// Queue `process` on the foreground or background class and return its id.
    ///
    /// Fails with `Overloaded` when the queue is full; nothing is registered
    /// in that case.
    pub fn submit(
        &self,
        process: impl Into<ProcessName>,
        inputs: ParameterMap,
        listener: Arc<dyn ProgressListener>,
        background: bool,
    ) -> ProcessResult<ExecutionId> {
        if self.inner.signal.is_triggered() {
            return Err(ProcessError::ShuttingDown);
        }

        let process = process.into();
        let backend = self.inner.catalog.resolve(&process)?;
        let priority = Priority::from_background_flag(background);
        let id = ExecutionId::new();
        let snapshot = context::capture().with_execution_id(id.clone());

        let entry = self.inner.registry.insert(ExecutionEntry::new(
            id.clone(),
            process.clone(),
            ExecutionMode::Queued(priority),
            listener,
        ));

        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        let job_entry = Arc::clone(&entry);
        let job = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                ExecutionManager { inner }.run_queued(job_entry, backend, inputs, snapshot);
            }
        });

        if let Err(err) = self.inner.pool.submit(id.clone(), priority, job) {
            self.inner.registry.evict(&id, "rejected");
            if let ProcessError::Overloaded { queued, .. } = &err {
                ExecutionRejected {
                    process: &process.to_string(),
                    queued: *queued,
                }
                .log();
            }
            return Err(err);
        }

        ExecutionSubmitted {
            execution_id: &id.to_string(),
            process: &process.to_string(),
            mode: if background { "background" } else { "foreground" },
        }
        .log();

        Ok(id)
    }

    fn run_queued(
        &self,
        entry: Arc<ExecutionEntry>,
        backend: Arc<dyn ProcessBackend>,
        inputs: ParameterMap,
        snapshot: ContextSnapshot,
    ) {
        let _context = snapshot.apply();

        if !entry.channel.start() {
            return;
        }

        let id_label = entry.id.to_string();
        let process_label = entry.process_name.to_string();
        let started_msg = ExecutionStarted {
            execution_id: &id_label,
            process: &process_label,
            backend: backend.name(),
        };
        let span = started_msg.span("queued_execution");
        let _span = span.enter();
        started_msg.log();
        entry.listener.started();

        let monitor = ProcessMonitor::queued(
            Arc::clone(&entry.channel),
            entry.cancel.clone(),
            Arc::clone(&entry.listener),
        );
        let request = ProcessRequest::new(
            entry.id.clone(),
            entry.process_name.clone(),
            inputs,
            monitor.clone(),
            self.clone(),
        );

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| backend.run_queued(&request)));
        drop(request);

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(BackendError::Failed(anyhow::anyhow!(
                "process panicked: {}",
                panic_message(payload.as_ref())
            ))),
        };

        self.settle(&entry, &monitor, result, started.elapsed());
    }

    /// Record the backend's outcome on the channel and tell the listener.
    ///
    /// The resource manager hears about the terminal status before the
    /// channel wakes any `get_output` waiter, whose eviction releases the
    /// execution's resources.
    fn settle(
        &self,
        entry: &ExecutionEntry,
        monitor: &ProcessMonitor,
        result: Result<ParameterMap, BackendError>,
        duration: Duration,
    ) {
        let id_label = entry.id.to_string();
        let process_label = entry.process_name.to_string();
        let resources = self.inner.registry.resources();

        match result {
            Ok(outputs) if !monitor.is_cancelled() => {
                ExecutionSucceeded {
                    execution_id: &id_label,
                    process: &process_label,
                    output_count: outputs.len(),
                    duration,
                }
                .log();
                entry.listener.completed();
                resources.on_terminal(&entry.id, ExecutionStatus::Succeeded);
                entry.channel.complete(outputs);
            }
            Err(BackendError::Failed(source)) if !monitor.is_cancelled() => {
                let err = ProcessError::BackendFailure {
                    process: process_label.clone(),
                    source,
                };
                ExecutionFailed {
                    execution_id: &id_label,
                    process: &process_label,
                    error: &err,
                }
                .log();
                entry.listener.failed(&err);
                resources.on_terminal(&entry.id, ExecutionStatus::Failed);
                entry.channel.fail(err);
            }
            // Acknowledged cancellation, or outcome produced after cancellation was requested
            _ => {
                ExecutionCancelled {
                    execution_id: &id_label,
                    process: &process_label,
                    while_queued: false,
                }
                .log();
                resources.on_terminal(&entry.id, ExecutionStatus::Cancelled);
                entry.channel.mark_cancelled();
            }
        }
    }

    /// Wait up to `timeout` for the execution to settle and take its outcome.
    ///
    /// * `StillRunning` on timeout; the execution is not affected
    /// * `UnknownExecution` once the outcome was taken by anyone
    /// * otherwise the outputs, the backend failure, or `Cancelled`
    pub fn get_output(&self, id: &ExecutionId, timeout: Duration) -> ProcessResult<ParameterMap> {
        let entry = self.inner.registry.get(id)?;
        let result = entry.channel.consume(id, timeout);

        match &result {
            Err(ProcessError::StillRunning { .. }) | Err(ProcessError::UnknownExecution { .. }) => {}
            _ => {
                ExecutionConsumed {
                    execution_id: &id.to_string(),
                    status: &entry.channel.status().to_string(),
                }
                .log();
                self.inner.registry.evict(id, "consumed");
            }
        }

        result
    }

    /// Best-effort cancellation. A queued execution ends `Cancelled` without
    /// running; a running one is asked to stop; a settled one is untouched.
    pub fn cancel(&self, id: &ExecutionId) -> ProcessResult<()> {
        let entry = self.inner.registry.get(id)?;
        if entry.channel.is_consumed() {
            return Err(ProcessError::unknown_execution(id));
        }

        if cancel_queued(&self.inner.registry, &entry) {
            self.inner.pool.remove(id);
            return Ok(());
        }

        if !entry.channel.status().is_terminal() {
            entry.cancel.cancel();
        }
        Ok(())
    }

    /// Non-consuming view of a queued execution.
    pub fn status(&self, id: &ExecutionId) -> ProcessResult<ExecutionSnapshot> {
        self.inner.registry.snapshot(id)
    }

    /// Run one reclamation sweep now. Returns the number of executions evicted.
    pub fn reclaim_abandoned(&self, abandoned_after: Duration) -> usize {
        let count = self.inner.registry.reap_abandoned(abandoned_after);
        if count > 0 {
            ExecutionsReclaimed {
                count,
                abandoned_after,
            }
            .log();
        }
        count
    }

    /// Stop accepting work, cancel queued executions, ask running ones to stop
    /// and wait for the worker threads to exit. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.signal.is_triggered()
    }

    pub fn catalog(&self) -> &ProcessCatalog {
        &self.inner.catalog
    }

    pub fn resources(&self) -> &Arc<dyn ResourceManager> {
        self.inner.registry.resources()
    }

    pub fn worker_threads(&self) -> usize {
        self.inner.pool.size()
    }

    /// Executions waiting for a worker, both classes.
    pub fn queued(&self) -> usize {
        self.inner.pool.queued()
    }

    pub fn queued_of(&self, priority: Priority) -> usize {
        self.inner.pool.queued_of(priority)
    }

    /// Registered executions, including settled ones not yet consumed.
    pub fn tracked(&self) -> usize {
        self.inner.registry.len()
    }
}

impl fmt::Debug for ExecutionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionManager")
            .field("catalog", &self.inner.catalog)
            .field("worker_threads", &self.inner.pool.size())
            .field("queued", &self.inner.pool.queued())
            .field("tracked", &self.inner.registry.len())
            .finish()
    }
}

/// Releases resources of a chained run that had no enclosing execution.
struct TransientResources<'a> {
    resources: &'a dyn ResourceManager,
    id: Option<ExecutionId>,
}

impl Drop for TransientResources<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.resources.release(&id);
        }
    }
}

pub struct ExecutionManagerBuilder {
    catalog: ProcessCatalog,
    worker_threads: usize,
    max_queued: usize,
    foreground_weight: u32,
    resources: Arc<dyn ResourceManager>,
    reclamation: Option<Reclamation>,
}

impl ExecutionManagerBuilder {
    pub fn new(catalog: ProcessCatalog) -> Self {
        Self {
            catalog,
            worker_threads: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_WORKER_THREADS_FALLBACK),
            max_queued: DEFAULT_MAX_QUEUED,
            foreground_weight: DEFAULT_FOREGROUND_WEIGHT,
            resources: Arc::new(NoopResourceManager),
            reclamation: Some(Reclamation::default()),
        }
    }

    pub fn worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Total pending executions across both classes before `Overloaded`.
    pub fn max_queued(mut self, max_queued: usize) -> Self {
        self.max_queued = max_queued;
        self
    }

    /// Consecutive foreground dispatches allowed while background work waits.
    pub fn foreground_weight(mut self, foreground_weight: u32) -> Self {
        self.foreground_weight = foreground_weight;
        self
    }

    pub fn resources(mut self, resources: Arc<dyn ResourceManager>) -> Self {
        self.resources = resources;
        self
    }

    /// `None` disables the background sweeper.
    pub fn reclamation(mut self, reclamation: Option<Reclamation>) -> Self {
        self.reclamation = reclamation;
        self
    }

    /// Fails with `InvalidSetting` for a pool without threads or a queue
    /// without room, either of which would leave submissions waiting forever.
    pub fn build(self) -> ProcessResult<ExecutionManager> {
        if self.worker_threads == 0 {
            return Err(ProcessError::InvalidSetting {
                setting: "worker_threads",
                reason: "must be at least 1",
            });
        }
        if self.max_queued == 0 {
            return Err(ProcessError::InvalidSetting {
                setting: "max_queued",
                reason: "must be at least 1",
            });
        }

        let registry = Arc::new(ExecutionRegistry::new(self.resources));
        let pool = WorkerPool::new(self.worker_threads, self.max_queued, self.foreground_weight)?;
        let signal = Arc::new(ShutdownSignal::default());

        let sweeper = match self.reclamation {
            Some(reclamation) => Some(spawn_sweeper(
                Arc::clone(&registry),
                Arc::clone(&signal),
                reclamation,
            )?),
            None => None,
        };

        Ok(ExecutionManager {
            inner: Arc::new(ManagerInner {
                catalog: self.catalog,
                registry,
                pool,
                signal,
                sweeper: Mutex::new(sweeper),
            }),
        })
    }
}

fn spawn_sweeper(
    registry: Arc<ExecutionRegistry>,
    signal: Arc<ShutdownSignal>,
    reclamation: Reclamation,
) -> ProcessResult<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("execution-sweeper".to_string())
        .spawn(move || {
            while !signal.wait_timeout(reclamation.sweep_interval) {
                let count = registry.reap_abandoned(reclamation.abandoned_after);
                if count > 0 {
                    ExecutionsReclaimed {
                        count,
                        abandoned_after: reclamation.abandoned_after,
                    }
                    .log();
                }
            }
        })?;
    Ok(handle)
}
