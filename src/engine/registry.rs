// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrent table of live and settled queued executions.
//!
//! Entries are keyed by [`ExecutionId`] in a sharded `DashMap`; all per-execution
//! state lives behind the entry's own [`ResultChannel`] lock, so unrelated
//! executions never contend on a shared mutex. Map shard locks are held only
//! for the duration of a lookup, insert or remove, never while waiting.
//!
//! Eviction is the single point where an execution's temporary resources are
//! released. It happens right after the outcome is consumed, or when the
//! sweeper reclaims an execution nobody came back for.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;

use crate::engine::execution::{
    ExecutionId, ExecutionMode, ExecutionSnapshot, ProcessName,
};
use crate::engine::progress::ProgressListener;
use crate::engine::result_channel::ResultChannel;
use crate::errors::{ProcessError, ProcessResult};
use crate::observability::messages::execution::ExecutionEvicted;
use crate::observability::messages::StructuredLog;
use crate::traits::ResourceManager;

/// Registry record of one queued execution.
pub struct ExecutionEntry {
    pub id: ExecutionId,
    pub process_name: ProcessName,
    pub mode: ExecutionMode,
    pub channel: Arc<ResultChannel>,
    pub cancel: CancellationToken,
    pub listener: Arc<dyn ProgressListener>,
    pub submitted_at: SystemTime,
}

impl ExecutionEntry {
    pub fn new(
        id: ExecutionId,
        process_name: ProcessName,
        mode: ExecutionMode,
        listener: Arc<dyn ProgressListener>,
    ) -> Self {
        Self {
            id,
            process_name,
            mode,
            channel: Arc::new(ResultChannel::new()),
            cancel: CancellationToken::new(),
            listener,
            submitted_at: SystemTime::now(),
        }
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        ExecutionSnapshot {
            id: self.id.clone(),
            process_name: self.process_name.clone(),
            mode: self.mode,
            status: self.channel.status(),
            progress: self.channel.progress(),
            submitted_at: self.submitted_at,
        }
    }
}

pub struct ExecutionRegistry {
    entries: DashMap<ExecutionId, Arc<ExecutionEntry>>,
    resources: Arc<dyn ResourceManager>,
}

impl ExecutionRegistry {
    pub fn new(resources: Arc<dyn ResourceManager>) -> Self {
        Self {
            entries: DashMap::new(),
            resources,
        }
    }

    pub fn insert(&self, entry: ExecutionEntry) -> Arc<ExecutionEntry> {
        let entry = Arc::new(entry);
        self.entries.insert(entry.id.clone(), Arc::clone(&entry));
        entry
    }

    /// Live entry for `id`. Consumed and evicted executions look the same as
    /// ids that never existed.
    pub fn get(&self, id: &ExecutionId) -> ProcessResult<Arc<ExecutionEntry>> {
        self.entries
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ProcessError::unknown_execution(id))
    }

    pub fn snapshot(&self, id: &ExecutionId) -> ProcessResult<ExecutionSnapshot> {
        let entry = self.get(id)?;
        if entry.channel.is_consumed() {
            return Err(ProcessError::unknown_execution(id));
        }
        Ok(entry.snapshot())
    }

    /// Remove the entry and release its resources. Returns `false` if another
    /// caller already evicted it.
    pub fn evict(&self, id: &ExecutionId, reason: &str) -> bool {
        if self.entries.remove(id).is_none() {
            return false;
        }
        self.resources.release(id);
        ExecutionEvicted {
            execution_id: &id.to_string(),
            reason,
        }
        .log();
        true
    }

    /// Evict terminal executions whose outcome has waited longer than
    /// `abandoned_after` without being read. Returns how many were reclaimed.
    pub fn reap_abandoned(&self, abandoned_after: Duration) -> usize {
        let now = Instant::now();
        let expired: Vec<Arc<ExecutionEntry>> = self
            .entries
            .iter()
            .filter(|entry| {
                entry
                    .channel
                    .finished_at()
                    .is_some_and(|finished| now.saturating_duration_since(finished) >= abandoned_after)
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        expired
            .into_iter()
            .filter(|entry| entry.channel.abandon())
            .filter(|entry| self.evict(&entry.id, "abandoned"))
            .count()
    }

    /// Ids of every registered execution, in no particular order.
    pub fn ids(&self) -> Vec<ExecutionId> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resources(&self) -> &Arc<dyn ResourceManager> {
        &self.resources
    }
}
