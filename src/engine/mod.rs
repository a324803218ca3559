// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod execution;
pub mod manager;
pub mod priority_work_queue;
pub mod progress;
pub mod registry;
pub mod result_channel;
pub mod worker_pool;
#[cfg(test)]
mod integration_tests;

pub use execution::{
    ExecutionId, ExecutionMode, ExecutionSnapshot, ExecutionStatus, ParameterMap, Priority,
    ProcessName,
};
pub use manager::{ExecutionManager, ExecutionManagerBuilder, Reclamation};
pub use progress::{NullProgressListener, ProcessMonitor, ProgressListener};
