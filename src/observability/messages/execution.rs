// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for execution lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Submission of chained and queued executions
//! * Running, completion, failure and cancellation
//! * Rejection when the queue is full
//! * Reclamation of executions nobody came back for

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Execution accepted by the manager.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use geoproc_executor::observability::messages::execution::ExecutionSubmitted;
///
/// let msg = ExecutionSubmitted {
///     execution_id: "0f8fad5b-d9cb-469f-a165-70867728950e",
///     process: "gs:Buffer",
///     mode: "background",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutionSubmitted<'a> {
    pub execution_id: &'a str,
    pub process: &'a str,
    pub mode: &'a str,
}

impl Display for ExecutionSubmitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution {} of '{}' submitted ({})",
            self.execution_id, self.process, self.mode
        )
    }
}

impl StructuredLog for ExecutionSubmitted<'_> {
    fn log(&self) {
        tracing::info!(
            execution_id = self.execution_id,
            process = self.process,
            mode = self.mode,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            execution_id = self.execution_id,
            process = self.process,
            mode = self.mode,
        )
    }
}

/// Execution picked up and handed to its backend.
///
/// # Log Level
/// `debug!` - Per-execution detail
pub struct ExecutionStarted<'a> {
    pub execution_id: &'a str,
    pub process: &'a str,
    pub backend: &'a str,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution {} running '{}' on backend '{}'",
            self.execution_id, self.process, self.backend
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            execution_id = self.execution_id,
            process = self.process,
            backend = self.backend,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_started",
            span_name = name,
            execution_id = self.execution_id,
            process = self.process,
            backend = self.backend,
        )
    }
}

/// Execution produced its outputs.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use geoproc_executor::observability::messages::execution::ExecutionSucceeded;
/// use std::time::Duration;
///
/// let msg = ExecutionSucceeded {
///     execution_id: "0f8fad5b-d9cb-469f-a165-70867728950e",
///     process: "gs:Buffer",
///     output_count: 1,
///     duration: Duration::from_millis(40),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutionSucceeded<'a> {
    pub execution_id: &'a str,
    pub process: &'a str,
    pub output_count: usize,
    pub duration: Duration,
}

impl Display for ExecutionSucceeded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution {} of '{}' succeeded with {} outputs in {:?}",
            self.execution_id, self.process, self.output_count, self.duration
        )
    }
}

impl StructuredLog for ExecutionSucceeded<'_> {
    fn log(&self) {
        tracing::info!(
            execution_id = self.execution_id,
            process = self.process,
            output_count = self.output_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_succeeded",
            span_name = name,
            execution_id = self.execution_id,
            process = self.process,
            duration = ?self.duration,
        )
    }
}

/// Execution failed in its backend.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use geoproc_executor::observability::messages::execution::ExecutionFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "bad geometry");
/// let msg = ExecutionFailed {
///     execution_id: "0f8fad5b-d9cb-469f-a165-70867728950e",
///     process: "gs:Buffer",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ExecutionFailed<'a> {
    pub execution_id: &'a str,
    pub process: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution {} of '{}' failed: {}",
            self.execution_id, self.process, self.error
        )
    }
}

impl StructuredLog for ExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            execution_id = self.execution_id,
            process = self.process,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "execution_failed",
            span_name = name,
            execution_id = self.execution_id,
            process = self.process,
            error = %self.error,
        )
    }
}

/// Execution ended by cancellation, before or during its run.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionCancelled<'a> {
    pub execution_id: &'a str,
    pub process: &'a str,
    pub while_queued: bool,
}

impl Display for ExecutionCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let stage = if self.while_queued { "queued" } else { "running" };
        write!(
            f,
            "Execution {} of '{}' cancelled while {}",
            self.execution_id, self.process, stage
        )
    }
}

impl StructuredLog for ExecutionCancelled<'_> {
    fn log(&self) {
        tracing::info!(
            execution_id = self.execution_id,
            process = self.process,
            while_queued = self.while_queued,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_cancelled",
            span_name = name,
            execution_id = self.execution_id,
            process = self.process,
        )
    }
}

/// Queued submission refused because the queue is full.
///
/// # Log Level
/// `warn!` - Load shedding
pub struct ExecutionRejected<'a> {
    pub process: &'a str,
    pub queued: usize,
}

impl Display for ExecutionRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected submission of '{}': {} executions already queued",
            self.process, self.queued
        )
    }
}

impl StructuredLog for ExecutionRejected<'_> {
    fn log(&self) {
        tracing::warn!(process = self.process, queued = self.queued, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "execution_rejected",
            span_name = name,
            process = self.process,
            queued = self.queued,
        )
    }
}

/// Outcome handed to its single reader.
///
/// # Log Level
/// `debug!` - Per-execution detail
pub struct ExecutionConsumed<'a> {
    pub execution_id: &'a str,
    pub status: &'a str,
}

impl Display for ExecutionConsumed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Execution {} consumed ({})", self.execution_id, self.status)
    }
}

impl StructuredLog for ExecutionConsumed<'_> {
    fn log(&self) {
        tracing::debug!(execution_id = self.execution_id, status = self.status, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("execution_consumed", span_name = name, execution_id = self.execution_id)
    }
}

/// Entry removed from the registry and its resources released.
///
/// # Log Level
/// `debug!` - Per-execution detail
pub struct ExecutionEvicted<'a> {
    pub execution_id: &'a str,
    pub reason: &'a str,
}

impl Display for ExecutionEvicted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Execution {} evicted: {}", self.execution_id, self.reason)
    }
}

impl StructuredLog for ExecutionEvicted<'_> {
    fn log(&self) {
        tracing::debug!(execution_id = self.execution_id, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("execution_evicted", span_name = name, execution_id = self.execution_id)
    }
}

/// Sweeper dropped executions whose outcome was never collected.
///
/// # Log Level
/// `warn!` - Client did not come back for results
pub struct ExecutionsReclaimed {
    pub count: usize,
    pub abandoned_after: Duration,
}

impl Display for ExecutionsReclaimed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reclaimed {} executions not collected within {:?}",
            self.count, self.abandoned_after
        )
    }
}

impl StructuredLog for ExecutionsReclaimed {
    fn log(&self) {
        tracing::warn!(
            count = self.count,
            abandoned_after_secs = self.abandoned_after.as_secs(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("executions_reclaimed", span_name = name, count = self.count)
    }
}
