// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::io;
use std::path::PathBuf;

use crate::engine::{ExecutionId, ExecutionStatus};

/// Owner of per-execution temporary resources (spooled files, scratch
/// directories).
///
/// Resources are tagged with the owning [`ExecutionId`] and belong to that
/// execution alone. The manager calls [`ResourceManager::on_terminal`] when the
/// execution settles and [`ResourceManager::release`] when the registry evicts
/// it, either right after its outcome was consumed or when the sweeper gives
/// up on an abandoned execution.
pub trait ResourceManager: Send + Sync {
    /// The execution reached `status`. Its outcome may not have been read yet,
    /// so resources backing the outputs must survive until `release`.
    fn on_terminal(&self, _id: &ExecutionId, _status: ExecutionStatus) {}

    /// Drop everything tagged with `id`. Called at most once per execution.
    fn release(&self, id: &ExecutionId);

    /// Temporary directory owned by `id`, created on first use and removed on
    /// `release`. Managers without storage report `Unsupported`.
    fn scratch_dir(&self, id: &ExecutionId) -> io::Result<PathBuf> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no scratch storage for execution '{id}'"),
        ))
    }
}
