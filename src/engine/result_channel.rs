// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Single-writer, at-most-once-reader handoff of an execution's outcome.
//!
//! Exactly one of [`ResultChannel::complete`], [`ResultChannel::fail`] or
//! [`ResultChannel::mark_cancelled`] takes effect per channel; later calls are
//! rejected and return `false`. The only read path is
//! [`ResultChannel::consume`], which blocks for a bounded time and hands the
//! outcome to the first caller that observes a terminal state. Every other
//! caller, concurrent or later, gets `UnknownExecution`.
//!
//! Status, progress and the outcome live under one per-channel lock, so the
//! writer's terminal transition is visible to any reader that later takes the
//! lock (release/acquire through the mutex).

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::engine::execution::{ExecutionId, ExecutionStatus, ParameterMap};
use crate::errors::{ProcessError, ProcessResult};

/// What the writer left for the reader.
#[derive(Debug)]
enum Outcome {
    Succeeded(ParameterMap),
    Failed(ProcessError),
    Cancelled,
}

#[derive(Debug)]
struct ChannelState {
    status: ExecutionStatus,
    progress: f32,
    outcome: Option<Outcome>,
    consumed: bool,
    finished_at: Option<Instant>,
}

#[derive(Debug)]
pub struct ResultChannel {
    state: Mutex<ChannelState>,
    terminal: Condvar,
}

impl ResultChannel {
    /// A fresh channel in `Queued` status.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState {
                status: ExecutionStatus::Queued,
                progress: 0.0,
                outcome: None,
                consumed: false,
                finished_at: None,
            }),
            terminal: Condvar::new(),
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        self.state.lock().status
    }

    pub fn progress(&self) -> f32 {
        self.state.lock().progress
    }

    pub fn is_consumed(&self) -> bool {
        self.state.lock().consumed
    }

    /// When the channel reached a terminal status, if it has.
    pub fn finished_at(&self) -> Option<Instant> {
        self.state.lock().finished_at
    }

    /// `Queued -> Running`. Returns `false` when the execution was cancelled
    /// while still queued; the caller must then skip the backend entirely.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        if !state.status.can_transition_to(ExecutionStatus::Running) {
            return false;
        }
        state.status = ExecutionStatus::Running;
        true
    }

    /// Record progress while running. Values are clamped to `0..=100` and
    /// never lower the stored value.
    pub fn report_progress(&self, percent: f32) -> bool {
        if percent.is_nan() {
            return false;
        }
        let mut state = self.state.lock();
        if state.status != ExecutionStatus::Running {
            return false;
        }
        let clamped = percent.clamp(0.0, 100.0);
        if clamped > state.progress {
            state.progress = clamped;
        }
        true
    }

    pub fn complete(&self, outputs: ParameterMap) -> bool {
        self.finish(ExecutionStatus::Succeeded, Outcome::Succeeded(outputs))
    }

    pub fn fail(&self, error: ProcessError) -> bool {
        self.finish(ExecutionStatus::Failed, Outcome::Failed(error))
    }

    /// Terminal `Cancelled` from either `Queued` or `Running`.
    pub fn mark_cancelled(&self) -> bool {
        self.finish(ExecutionStatus::Cancelled, Outcome::Cancelled)
    }

    /// Terminal `Cancelled` only if the execution never started.
    pub fn cancel_if_queued(&self) -> bool {
        self.cancel_if_queued_then(|| {})
    }

    /// [`ResultChannel::cancel_if_queued`], running `before` once the
    /// cancellation is certain but before any reader can observe it.
    pub fn cancel_if_queued_then(&self, before: impl FnOnce()) -> bool {
        let mut state = self.state.lock();
        if state.status != ExecutionStatus::Queued {
            return false;
        }
        before();
        Self::settle(&mut state, ExecutionStatus::Cancelled, Outcome::Cancelled);
        drop(state);
        self.terminal.notify_all();
        true
    }

    fn finish(&self, status: ExecutionStatus, outcome: Outcome) -> bool {
        let mut state = self.state.lock();
        if !state.status.can_transition_to(status) {
            return false;
        }
        Self::settle(&mut state, status, outcome);
        drop(state);
        self.terminal.notify_all();
        true
    }

    fn settle(state: &mut ChannelState, status: ExecutionStatus, outcome: Outcome) {
        state.status = status;
        if status == ExecutionStatus::Succeeded {
            state.progress = 100.0;
        }
        state.outcome = Some(outcome);
        state.finished_at = Some(Instant::now());
    }

    /// Wait up to `timeout` for a terminal status, then hand over the outcome
    /// exactly once.
    ///
    /// * not terminal in time: `StillRunning`, the execution is untouched
    /// * already consumed: `UnknownExecution`
    /// * otherwise: outputs, the recorded failure, or `Cancelled`
    pub fn consume(&self, id: &ExecutionId, timeout: Duration) -> ProcessResult<ParameterMap> {
        let mut state = self.state.lock();

        match Instant::now().checked_add(timeout) {
            Some(deadline) => {
                while !state.status.is_terminal() {
                    if self.terminal.wait_until(&mut state, deadline).timed_out()
                        && !state.status.is_terminal()
                    {
                        return Err(ProcessError::StillRunning { id: id.to_string() });
                    }
                }
            }
            None => {
                while !state.status.is_terminal() {
                    self.terminal.wait(&mut state);
                }
            }
        }

        if state.consumed {
            return Err(ProcessError::unknown_execution(id));
        }
        state.consumed = true;

        match state.outcome.take() {
            Some(Outcome::Succeeded(outputs)) => Ok(outputs),
            Some(Outcome::Failed(error)) => Err(error),
            Some(Outcome::Cancelled) | None => Err(ProcessError::Cancelled { id: id.to_string() }),
        }
    }

    /// Mark a terminal, never-read outcome as consumed and drop it.
    /// Used when reclaiming abandoned executions.
    pub fn abandon(&self) -> bool {
        let mut state = self.state.lock();
        if !state.status.is_terminal() || state.consumed {
            return false;
        }
        state.consumed = true;
        state.outcome = None;
        true
    }
}

impl Default for ResultChannel {
    fn default() -> Self {
        Self::new()
    }
}
