// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test-only backends and request helpers.

use std::sync::Arc;

use crate::catalog::ProcessCatalog;
use crate::engine::progress::ProcessMonitor;
use crate::engine::{ExecutionId, ExecutionManager, ParameterMap, ProcessName};
use crate::errors::BackendError;
use crate::traits::{ProcessBackend, ProcessRequest};

type RunFn = dyn Fn(&ProcessRequest) -> Result<ParameterMap, BackendError> + Send + Sync;

/// Backend serving exactly one process name with a closure.
pub struct FnBackend {
    name: String,
    process: ProcessName,
    run: Arc<RunFn>,
}

impl FnBackend {
    pub fn new<F>(process: &str, run: F) -> Self
    where
        F: Fn(&ProcessRequest) -> Result<ParameterMap, BackendError> + Send + Sync + 'static,
    {
        Self {
            name: format!("fn({process})"),
            process: ProcessName::parse(process),
            run: Arc::new(run),
        }
    }
}

impl ProcessBackend for FnBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_handle(&self, process: &ProcessName) -> bool {
        process == &self.process
    }

    fn declared_processes(&self) -> Vec<ProcessName> {
        vec![self.process.clone()]
    }

    fn run(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        (self.run)(request)
    }
}

/// Backend claiming a namespace, or only the listed names in it. Echoes its
/// inputs.
pub struct NamespaceBackend {
    name: String,
    namespace: String,
    locals: Vec<String>,
}

impl NamespaceBackend {
    pub fn new(name: &str, namespace: &str, locals: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            locals: locals.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl ProcessBackend for NamespaceBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_handle(&self, process: &ProcessName) -> bool {
        process.namespace() == Some(self.namespace.as_str())
            && (self.locals.is_empty() || self.locals.iter().any(|l| l == process.local()))
    }

    fn declared_processes(&self) -> Vec<ProcessName> {
        self.locals
            .iter()
            .map(|local| ProcessName::new(self.namespace.clone(), local.clone()))
            .collect()
    }

    fn run(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        Ok(request.inputs().clone())
    }
}

/// Request for driving a backend or process directly, outside any manager
/// run. Nested chained calls from it find an empty catalog.
pub fn test_request(process: &str, inputs: ParameterMap) -> ProcessRequest {
    let manager = ExecutionManager::builder(ProcessCatalog::new())
        .worker_threads(1)
        .reclamation(None)
        .build()
        .expect("manager for test request");

    ProcessRequest::new(
        ExecutionId::new(),
        ProcessName::parse(process),
        inputs,
        ProcessMonitor::detached(),
        manager,
    )
}
