// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Core data model for a single process execution.
//!
//! An execution is one run of a named process with a specific set of inputs.
//! This module holds the identity and classification types shared by the
//! registry, the result channel and the manager:
//!
//! * [`ExecutionId`] - opaque token generated at submission
//! * [`ProcessName`] - qualified `namespace:name` used to find a backend
//! * [`ExecutionStatus`] - forward-only lifecycle state
//! * [`ExecutionMode`] / [`Priority`] - chained (inline) vs queued (pooled)
//! * [`ExecutionSnapshot`] - non-consuming view returned by status queries

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use uuid::Uuid;

/// Process inputs and outputs: parameter name to value, unique keys, ordered.
pub type ParameterMap = BTreeMap<String, serde_json::Value>;

/// Opaque unique identifier of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ExecutionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Qualified process name, e.g. `gs:Buffer` or a bare `Buffer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessName {
    namespace: Option<String>,
    local: String,
}

impl ProcessName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    pub fn unqualified(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Split on the first `:`; no colon means no namespace.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once(':') {
            Some((ns, local)) if !ns.is_empty() => Self::new(ns, local),
            _ => Self::unqualified(qualified),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl From<&str> for ProcessName {
    fn from(value: &str) -> Self {
        ProcessName::parse(value)
    }
}

impl From<String> for ProcessName {
    fn from(value: String) -> Self {
        ProcessName::parse(&value)
    }
}

/// Lifecycle state of an execution.
///
/// Transitions only move forward:
///
/// ```text
/// Queued -> Running -> { Succeeded | Failed | Cancelled }
/// Queued -> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Whether moving from `self` to `next` respects the forward-only lifecycle.
    pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Priority class of a queued execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Interactive work with a client connection waiting on it.
    Foreground,
    /// Batch work polled by the client; may run at a lower pace.
    Background,
}

impl Priority {
    pub fn from_background_flag(background: bool) -> Self {
        if background {
            Priority::Background
        } else {
            Priority::Foreground
        }
    }
}

/// How an execution is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Inline on the caller's thread, never on a pool thread.
    Chained,
    /// On a worker pool thread, in the given priority class.
    Queued(Priority),
}

/// Point-in-time view of a registered execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSnapshot {
    pub id: ExecutionId,
    pub process_name: ProcessName,
    pub mode: ExecutionMode,
    pub status: ExecutionStatus,
    pub progress: f32,
    pub submitted_at: SystemTime,
}
