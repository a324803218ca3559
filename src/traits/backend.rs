// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::engine::progress::ProcessMonitor;
use crate::engine::{ExecutionId, ExecutionManager, ParameterMap, ProcessName};
use crate::errors::{BackendError, ProcessResult};

/// A family of processes the manager can run.
///
/// The [`ProcessCatalog`](crate::catalog::ProcessCatalog) asks every backend
/// whether it [`can_handle`](ProcessBackend::can_handle) a name; exactly one
/// must answer yes. Backends are synchronous: `run` blocks its thread until the
/// process finishes, fails, or notices cancellation through
/// [`ProcessRequest::monitor`].
pub trait ProcessBackend: Send + Sync {
    /// Identifier used in logs and ambiguity reports.
    fn name(&self) -> &str;

    fn can_handle(&self, process: &ProcessName) -> bool;

    /// Names this backend knows it serves, checked for overlap at registration.
    /// Backends matching by pattern may leave this empty.
    fn declared_processes(&self) -> Vec<ProcessName> {
        Vec::new()
    }

    fn run(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError>;

    /// Inline run on the caller's thread. Defaults to [`ProcessBackend::run`].
    fn run_chained(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        self.run(request)
    }

    /// Run on a pool thread. Defaults to [`ProcessBackend::run`].
    fn run_queued(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        self.run(request)
    }
}

/// Everything a backend gets for one run.
pub struct ProcessRequest {
    execution_id: ExecutionId,
    process_name: ProcessName,
    inputs: ParameterMap,
    monitor: ProcessMonitor,
    manager: ExecutionManager,
}

impl ProcessRequest {
    pub fn new(
        execution_id: ExecutionId,
        process_name: ProcessName,
        inputs: ParameterMap,
        monitor: ProcessMonitor,
        manager: ExecutionManager,
    ) -> Self {
        Self {
            execution_id,
            process_name,
            inputs,
            monitor,
            manager,
        }
    }

    /// Execution the run belongs to. For chained runs this is the enclosing
    /// execution when there is one.
    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    pub fn process_name(&self) -> &ProcessName {
        &self.process_name
    }

    pub fn inputs(&self) -> &ParameterMap {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&serde_json::Value> {
        self.inputs.get(name)
    }

    /// Like [`ProcessRequest::input`] but a missing parameter is a failure.
    pub fn require_input(&self, name: &str) -> Result<&serde_json::Value, BackendError> {
        self.inputs.get(name).ok_or_else(|| {
            BackendError::msg(format!(
                "process '{}' requires input '{}'",
                self.process_name, name
            ))
        })
    }

    pub fn monitor(&self) -> &ProcessMonitor {
        &self.monitor
    }

    pub fn report_progress(&self, percent: f32) {
        self.monitor.report_progress(percent);
    }

    /// Scratch directory of this run's execution, from the manager's
    /// [`ResourceManager`](crate::traits::ResourceManager).
    pub fn scratch_dir(&self) -> io::Result<PathBuf> {
        self.manager.resources().scratch_dir(&self.execution_id)
    }

    /// `Err(BackendError::Cancelled)` once cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), BackendError> {
        self.monitor.checkpoint()
    }

    /// Run another process synchronously on this thread, as an input step of
    /// this one. Cancelling this execution cancels the nested one.
    pub fn run_chained(
        &self,
        process: impl Into<ProcessName>,
        inputs: ParameterMap,
    ) -> ProcessResult<ParameterMap> {
        self.manager
            .run_nested(process.into(), inputs, self.monitor.nested())
    }
}

impl fmt::Debug for ProcessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRequest")
            .field("execution_id", &self.execution_id)
            .field("process_name", &self.process_name)
            .field("inputs", &self.inputs)
            .field("monitor", &self.monitor)
            .finish()
    }
}
