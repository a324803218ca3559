// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-execution temporary storage.
//!
//! [`TempResourceManager`] hands every execution its own scratch directory,
//! created on first use and tagged with the execution id. Backends find it
//! through the ambient execution id (see [`crate::context::current_execution_id`])
//! or the id on their request. The directory and everything in it is removed
//! when the registry evicts the execution.

use dashmap::DashMap;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::engine::{ExecutionId, ExecutionStatus};
use crate::traits::ResourceManager;

/// Resource manager that owns nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResourceManager;

impl ResourceManager for NoopResourceManager {
    fn release(&self, _id: &ExecutionId) {}
}

#[derive(Debug, Default)]
pub struct TempResourceManager {
    root: Option<PathBuf>,
    scratch: DashMap<ExecutionId, TempDir>,
}

impl TempResourceManager {
    /// Scratch directories under the system temp dir.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch directories under `root`, which is created on first use.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
            scratch: DashMap::new(),
        }
    }

    /// Scratch directory of `id`, created if needed.
    pub fn scratch_dir(&self, id: &ExecutionId) -> io::Result<PathBuf> {
        if let Some(existing) = self.scratch.get(id) {
            return Ok(existing.path().to_path_buf());
        }

        let prefix = format!("geoproc-{id}-");
        let created = match &self.root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix(&prefix).tempdir()?,
        };

        // Two threads of one execution may race here; the first insert wins
        let entry = self.scratch.entry(id.clone()).or_insert(created);
        Ok(entry.path().to_path_buf())
    }

    /// Whether `id` currently owns a scratch directory.
    pub fn has_scratch(&self, id: &ExecutionId) -> bool {
        self.scratch.contains_key(id)
    }

    pub fn live_executions(&self) -> usize {
        self.scratch.len()
    }
}

impl ResourceManager for TempResourceManager {
    fn on_terminal(&self, id: &ExecutionId, status: ExecutionStatus) {
        tracing::debug!(execution_id = %id, %status, "execution settled, scratch kept until eviction");
    }

    fn scratch_dir(&self, id: &ExecutionId) -> io::Result<PathBuf> {
        TempResourceManager::scratch_dir(self, id)
    }

    fn release(&self, id: &ExecutionId) {
        if let Some((_, dir)) = self.scratch.remove(id) {
            let path = dir.path().to_path_buf();
            if let Err(err) = dir.close() {
                tracing::warn!(execution_id = %id, path = %path.display(), error = %err, "failed to remove scratch directory");
            }
        }
    }
}
