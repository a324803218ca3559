// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Remote-delegated backend: processes run by another service.
//!
//! The backend submits the job through a [`RemoteClient`], then polls it at a
//! fixed interval until it settles, forwarding progress into the local
//! execution. Cancellation of the local execution, or losing track of the job
//! because polling fails, dismisses the remote job.
//! The transport (HTTP, a message queue, ...) lives entirely behind the
//! client trait.

use std::sync::Arc;
use std::time::Duration;

use crate::config::consts::DEFAULT_REMOTE_POLL_INTERVAL_MS;
use crate::engine::{ParameterMap, ProcessName};
use crate::errors::BackendError;
use crate::traits::{ProcessBackend, ProcessRequest};

/// State of a job on the remote side.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteJobState {
    Running { progress: f32 },
    Succeeded(ParameterMap),
    Failed(String),
    /// The remote side dropped the job (dismissed or expired).
    Dismissed,
}

/// Transport to a remote processing service.
pub trait RemoteClient: Send + Sync {
    /// Start a job and return its remote identifier.
    fn submit(&self, process: &ProcessName, inputs: &ParameterMap) -> anyhow::Result<String>;

    fn poll(&self, job: &str) -> anyhow::Result<RemoteJobState>;

    /// Ask the remote side to abandon the job.
    fn dismiss(&self, job: &str) -> anyhow::Result<()>;
}

pub struct RemoteBackend {
    name: String,
    namespaces: Vec<String>,
    client: Arc<dyn RemoteClient>,
    poll_interval: Duration,
}

impl RemoteBackend {
    /// Backend delegating every process of the given namespaces to `client`.
    pub fn new<I, S>(name: impl Into<String>, namespaces: I, client: Arc<dyn RemoteClient>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            client,
            poll_interval: Duration::from_millis(DEFAULT_REMOTE_POLL_INTERVAL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn dismiss(&self, job: &str) {
        if let Err(err) = self.client.dismiss(job) {
            tracing::warn!(backend = %self.name, job, error = %err, "failed to dismiss remote job");
        }
    }
}

impl ProcessBackend for RemoteBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_handle(&self, process: &ProcessName) -> bool {
        process
            .namespace()
            .is_some_and(|ns| self.namespaces.iter().any(|served| served == ns))
    }

    fn run(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        request.checkpoint()?;
        let job = self
            .client
            .submit(request.process_name(), request.inputs())?;
        tracing::debug!(backend = %self.name, job = %job, process = %request.process_name(), "remote job submitted");

        loop {
            if request.monitor().is_cancelled() {
                self.dismiss(&job);
                return Err(BackendError::Cancelled);
            }

            let state = match self.client.poll(&job) {
                Ok(state) => state,
                Err(err) => {
                    self.dismiss(&job);
                    return Err(BackendError::Failed(
                        err.context(format!("polling remote job {job} failed")),
                    ));
                }
            };

            match state {
                RemoteJobState::Running { progress } => request.report_progress(progress),
                RemoteJobState::Succeeded(outputs) => return Ok(outputs),
                RemoteJobState::Failed(reason) => {
                    return Err(BackendError::msg(format!("remote job {job} failed: {reason}")))
                }
                RemoteJobState::Dismissed => {
                    return Err(BackendError::msg(format!("remote job {job} was dismissed")))
                }
            }

            if let Err(cancelled) = request.monitor().wait_or_cancel(self.poll_interval) {
                self.dismiss(&job);
                return Err(cancelled);
            }
        }
    }
}
