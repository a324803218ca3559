// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for worker pool events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Worker threads are up and waiting for work.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkerPoolStarted {
    pub workers: usize,
    pub max_queued: usize,
    pub foreground_weight: u32,
}

impl Display for WorkerPoolStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker pool started: {} workers, max_queued={}, foreground_weight={}",
            self.workers, self.max_queued, self.foreground_weight
        )
    }
}

impl StructuredLog for WorkerPoolStarted {
    fn log(&self) {
        tracing::info!(
            workers = self.workers,
            max_queued = self.max_queued,
            foreground_weight = self.foreground_weight,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "worker_pool",
            span_name = name,
            workers = self.workers,
            max_queued = self.max_queued,
        )
    }
}

/// A job panicked; the worker survives and moves on.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct WorkerJobPanicked<'a> {
    pub worker: &'a str,
    pub execution_id: &'a str,
    pub message: &'a str,
}

impl Display for WorkerJobPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker '{}' recovered from panic in execution {}: {}",
            self.worker, self.execution_id, self.message
        )
    }
}

impl StructuredLog for WorkerJobPanicked<'_> {
    fn log(&self) {
        tracing::error!(
            worker = self.worker,
            execution_id = self.execution_id,
            panic = self.message,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "worker_panic",
            span_name = name,
            worker = self.worker,
            execution_id = self.execution_id,
        )
    }
}

/// Pool stopped accepting work and its threads exited.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkerPoolStopped {
    pub workers: usize,
    pub drained: usize,
}

impl Display for WorkerPoolStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker pool stopped: {} workers joined, {} queued executions discarded",
            self.workers, self.drained
        )
    }
}

impl StructuredLog for WorkerPoolStopped {
    fn log(&self) {
        tracing::info!(workers = self.workers, drained = self.drained, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("worker_pool_stopped", span_name = name, drained = self.drained)
    }
}
