// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Maps a process name to the single backend able to run it.
//!
//! Backends are registered once at startup. Registration rejects a backend
//! that declares a name another backend already handles; [`ProcessCatalog::resolve`]
//! repeats the uniqueness check at lookup time because pattern-matching
//! backends may overlap on names neither of them declared.

use std::fmt;
use std::sync::Arc;

use crate::engine::ProcessName;
use crate::errors::{ProcessError, ProcessResult};
use crate::observability::messages::catalog::{BackendRegistered, ProcessResolutionFailed};
use crate::observability::messages::StructuredLog;
use crate::traits::ProcessBackend;

#[derive(Default, Clone)]
pub struct ProcessCatalog {
    backends: Vec<Arc<dyn ProcessBackend>>,
}

impl ProcessCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend. Fails with `AmbiguousProcess` if any name it declares is
    /// already handled, or if it handles a name declared by an earlier backend.
    pub fn register(&mut self, backend: Arc<dyn ProcessBackend>) -> ProcessResult<()> {
        let declared = backend.declared_processes();

        for existing in &self.backends {
            let overlap = declared
                .iter()
                .find(|name| existing.can_handle(name))
                .cloned()
                .or_else(|| {
                    existing
                        .declared_processes()
                        .into_iter()
                        .find(|name| backend.can_handle(name))
                });

            if let Some(name) = overlap {
                return Err(ProcessError::AmbiguousProcess {
                    name: name.to_string(),
                    backends: vec![existing.name().to_string(), backend.name().to_string()],
                });
            }
        }

        BackendRegistered {
            backend: backend.name(),
            declared_processes: declared.len(),
        }
        .log();

        self.backends.push(backend);
        Ok(())
    }

    /// Builder-style [`ProcessCatalog::register`].
    pub fn with_backend(mut self, backend: Arc<dyn ProcessBackend>) -> ProcessResult<Self> {
        self.register(backend)?;
        Ok(self)
    }

    /// The one backend that claims `process`.
    pub fn resolve(&self, process: &ProcessName) -> ProcessResult<Arc<dyn ProcessBackend>> {
        let mut candidates = self
            .backends
            .iter()
            .filter(|backend| backend.can_handle(process));

        let first = candidates.next();
        let rest: Vec<&Arc<dyn ProcessBackend>> = candidates.collect();

        match (first, rest.is_empty()) {
            (Some(backend), true) => Ok(Arc::clone(backend)),
            (None, _) => {
                ProcessResolutionFailed {
                    process: &process.to_string(),
                    candidates: 0,
                }
                .log();
                Err(ProcessError::UnknownProcess {
                    name: process.to_string(),
                })
            }
            (Some(backend), false) => {
                let backends: Vec<String> = std::iter::once(backend)
                    .chain(rest)
                    .map(|b| b.name().to_string())
                    .collect();
                ProcessResolutionFailed {
                    process: &process.to_string(),
                    candidates: backends.len(),
                }
                .log();
                Err(ProcessError::AmbiguousProcess {
                    name: process.to_string(),
                    backends,
                })
            }
        }
    }

    /// Every name declared by a registered backend, sorted.
    pub fn declared_processes(&self) -> Vec<ProcessName> {
        let mut names: Vec<ProcessName> = self
            .backends
            .iter()
            .flat_map(|backend| backend.declared_processes())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl fmt::Debug for ProcessCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.backends.iter().map(|backend| backend.name()))
            .finish()
    }
}
