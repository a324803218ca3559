// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error taxonomy for process submission, execution and retrieval.
//!
//! `ProcessError` is what callers of the [`ExecutionManager`] see. It keeps
//! the distinction between a backend failure, a cancellation and an overload
//! intact all the way to the top-level request handler, which maps each to a
//! different externally visible status.
//!
//! `BackendError` is what backends return. Backend authors report failures as
//! `anyhow::Error` and acknowledge cancellation with [`BackendError::Cancelled`].
//!
//! [`ExecutionManager`]: crate::engine::ExecutionManager

use thiserror::Error;

use crate::engine::Priority;

#[derive(Error, Debug)]
pub enum ProcessError {
    /// No registered backend claims the process name.
    #[error("Unknown process '{name}'")]
    UnknownProcess { name: String },

    /// More than one backend claims the process name. This is a
    /// configuration error, never resolved at runtime.
    #[error("Process '{name}' is claimed by multiple backends: {}", .backends.join(", "))]
    AmbiguousProcess { name: String, backends: Vec<String> },

    /// The worker queue reached its configured depth.
    #[error("Execution queue is full ({queued} pending, rejected {priority:?} submission)")]
    Overloaded { priority: Priority, queued: usize },

    /// The wait timed out; the execution keeps running and may be polled again.
    #[error("Execution '{id}' is still running")]
    StillRunning { id: String },

    /// The backend reported a failure.
    #[error("Process '{process}' failed: {source}")]
    BackendFailure {
        process: String,
        #[source]
        source: anyhow::Error,
    },

    /// The execution was cancelled before producing outputs.
    #[error("Execution '{id}' was cancelled")]
    Cancelled { id: String },

    /// Already consumed, evicted, or never existed. Deliberately
    /// indistinguishable between those cases.
    #[error("Unknown execution '{id}'")]
    UnknownExecution { id: String },

    /// The manager is shutting down and no longer accepts work.
    #[error("Execution manager is shutting down")]
    ShuttingDown,

    /// A blocking wait delegated to another thread did not return.
    #[error("Interrupted while waiting for execution '{id}': {reason}")]
    Interrupted { id: String, reason: String },

    /// A manager setting is outside its usable range.
    #[error("Invalid executor setting '{setting}': {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: &'static str,
    },

    /// A worker thread could not be started.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ProcessError {
    /// Whether repeating the same call later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProcessError::StillRunning { .. } | ProcessError::Overloaded { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessError::Cancelled { .. })
    }

    pub fn unknown_execution(id: impl ToString) -> Self {
        ProcessError::UnknownExecution { id: id.to_string() }
    }
}

pub type ProcessResult<T> = Result<T, ProcessError>;

/// Outcome reported by a backend that did not produce outputs.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend observed the cancellation flag and aborted.
    #[error("process aborted after cancellation request")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl BackendError {
    /// Shorthand for a failure carrying only a message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        BackendError::Failed(anyhow::Error::msg(message))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Failed(err.into())
    }
}

/// Lets a backend use `?` on a nested chained call. Cancellation stays
/// cancellation; anything else becomes the backend's own failure.
impl From<ProcessError> for BackendError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Cancelled { .. } => BackendError::Cancelled,
            other => BackendError::Failed(anyhow::Error::new(other)),
        }
    }
}
