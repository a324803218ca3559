// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Async facade over the [`ExecutionManager`] for request dispatchers that
//! run on a tokio runtime.
//!
//! Waiting calls of the manager block their thread, so they are moved onto
//! tokio's blocking pool with `spawn_blocking`. Calls that never block beyond
//! a lock (`submit`, `cancel`, `status`) go straight through.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use geoproc_executor::backends::local::LocalBackend;
//! use geoproc_executor::catalog::ProcessCatalog;
//! use geoproc_executor::dispatch::AsyncExecutionClient;
//! use geoproc_executor::engine::{ExecutionManager, NullProgressListener, ParameterMap};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = ProcessCatalog::new().with_backend(Arc::new(LocalBackend::with_builtin("geo")))?;
//! let client = AsyncExecutionClient::new(ExecutionManager::builder(catalog).worker_threads(1).build()?);
//!
//! let inputs = ParameterMap::from([("millis".to_string(), json!(20))]);
//! let id = client.submit("geo:delay", inputs, Arc::new(NullProgressListener), true)?;
//! let outputs = client.wait_for_output(&id, Duration::from_secs(5)).await?;
//! assert!(outputs.contains_key("slept_ms"));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context;
use crate::engine::{
    ExecutionId, ExecutionManager, ExecutionSnapshot, ParameterMap, ProcessName, ProgressListener,
};
use crate::errors::{ProcessError, ProcessResult};

/// Longest single blocking wait issued by [`AsyncExecutionClient::wait_for_output`].
const DEFAULT_POLL_SLICE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct AsyncExecutionClient {
    manager: ExecutionManager,
    poll_slice: Duration,
}

impl AsyncExecutionClient {
    pub fn new(manager: ExecutionManager) -> Self {
        Self {
            manager,
            poll_slice: DEFAULT_POLL_SLICE,
        }
    }

    pub fn with_poll_slice(mut self, poll_slice: Duration) -> Self {
        self.poll_slice = poll_slice.max(Duration::from_millis(1));
        self
    }

    pub fn manager(&self) -> &ExecutionManager {
        &self.manager
    }

    /// Queue a process. Returns as soon as it is registered.
    pub fn submit(
        &self,
        process: impl Into<ProcessName>,
        inputs: ParameterMap,
        listener: Arc<dyn ProgressListener>,
        background: bool,
    ) -> ProcessResult<ExecutionId> {
        self.manager.submit(process, inputs, listener, background)
    }

    /// Run a chained process to completion on the blocking pool, under the
    /// context of the calling task's thread.
    pub async fn run_chained(
        &self,
        process: impl Into<ProcessName>,
        inputs: ParameterMap,
        listener: Arc<dyn ProgressListener>,
    ) -> ProcessResult<ParameterMap> {
        let process = process.into();
        let label = process.to_string();
        let manager = self.manager.clone();
        let snapshot = context::capture();
        tokio::task::spawn_blocking(move || {
            context::with_context(snapshot, || manager.submit_chained(process, inputs, listener))
        })
            .await
            .map_err(|err| ProcessError::Interrupted {
                id: label,
                reason: err.to_string(),
            })?
    }

    /// [`ExecutionManager::get_output`] without blocking the async runtime.
    pub async fn get_output(&self, id: &ExecutionId, timeout: Duration) -> ProcessResult<ParameterMap> {
        let manager = self.manager.clone();
        let owned = id.clone();
        tokio::task::spawn_blocking(move || manager.get_output(&owned, timeout))
            .await
            .map_err(|err| ProcessError::Interrupted {
                id: id.to_string(),
                reason: err.to_string(),
            })?
    }

    /// Keep waiting through `StillRunning` until the outcome arrives or
    /// `deadline` has passed, in which case the last `StillRunning` is
    /// returned. The execution keeps running either way.
    pub async fn wait_for_output(&self, id: &ExecutionId, deadline: Duration) -> ProcessResult<ParameterMap> {
        let started = Instant::now();
        loop {
            let remaining = deadline.saturating_sub(started.elapsed());
            match self.get_output(id, remaining.min(self.poll_slice)).await {
                Err(err @ ProcessError::StillRunning { .. }) if remaining.is_zero() => return Err(err),
                Err(ProcessError::StillRunning { .. }) => continue,
                other => return other,
            }
        }
    }

    pub fn cancel(&self, id: &ExecutionId) -> ProcessResult<()> {
        self.manager.cancel(id)
    }

    pub fn status(&self, id: &ExecutionId) -> ProcessResult<ExecutionSnapshot> {
        self.manager.status(id)
    }
}
