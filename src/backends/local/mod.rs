// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process backend: processes implemented as Rust code in this binary.
//!
//! A [`LocalBackend`] serves one namespace. Each local name maps to a
//! [`Process`]; built-in ones come from [`LocalProcessFactory`], and any
//! `Fn(&ProcessRequest) -> Result<ParameterMap, BackendError>` closure can be
//! registered as well.

pub mod factory;
pub mod processes;

pub use factory::LocalProcessFactory;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::{ParameterMap, ProcessName};
use crate::errors::{BackendError, ProcessResult};
use crate::traits::{ProcessBackend, ProcessRequest};

/// One in-process computation.
pub trait Process: Send + Sync {
    fn execute(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError>;
}

impl<F> Process for F
where
    F: Fn(&ProcessRequest) -> Result<ParameterMap, BackendError> + Send + Sync,
{
    fn execute(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        self(request)
    }
}

pub struct LocalBackend {
    name: String,
    namespace: String,
    processes: BTreeMap<String, Arc<dyn Process>>,
}

impl LocalBackend {
    /// Empty backend for `namespace`, named `local`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            name: "local".to_string(),
            namespace: namespace.into(),
            processes: BTreeMap::new(),
        }
    }

    /// Backend serving every built-in process under `namespace`.
    pub fn with_builtin(namespace: impl Into<String>) -> Self {
        let mut backend = Self::new(namespace);
        for implementation in LocalProcessFactory::list_available_implementations() {
            if let Ok(process) = LocalProcessFactory::create_process(implementation) {
                backend.register(implementation, process);
            }
        }
        backend
    }

    /// Backend serving the listed built-in processes. Unknown names fail.
    pub fn with_processes<S: AsRef<str>>(namespace: impl Into<String>, names: &[S]) -> ProcessResult<Self> {
        let mut backend = Self::new(namespace);
        for name in names {
            let process = LocalProcessFactory::create_process(name.as_ref())?;
            backend.register(name.as_ref(), process);
        }
        Ok(backend)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn register(&mut self, local_name: impl Into<String>, process: Arc<dyn Process>) {
        self.processes.insert(local_name.into(), process);
    }

    pub fn with_process(mut self, local_name: impl Into<String>, process: impl Process + 'static) -> Self {
        self.register(local_name, Arc::new(process));
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl ProcessBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_handle(&self, process: &ProcessName) -> bool {
        process.namespace() == Some(self.namespace.as_str())
            && self.processes.contains_key(process.local())
    }

    fn declared_processes(&self) -> Vec<ProcessName> {
        self.processes
            .keys()
            .map(|local| ProcessName::new(self.namespace.clone(), local.clone()))
            .collect()
    }

    fn run(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        let process = self
            .processes
            .get(request.process_name().local())
            .ok_or_else(|| {
                BackendError::msg(format!(
                    "backend '{}' has no process '{}'",
                    self.name,
                    request.process_name()
                ))
            })?;
        process.execute(request)
    }
}
