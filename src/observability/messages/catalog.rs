// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for backend registration and process lookup.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Backend added to the catalog.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use geoproc_executor::observability::messages::catalog::BackendRegistered;
///
/// let msg = BackendRegistered {
///     backend: "local",
///     declared_processes: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct BackendRegistered<'a> {
    pub backend: &'a str,
    pub declared_processes: usize,
}

impl Display for BackendRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered backend '{}' declaring {} processes",
            self.backend, self.declared_processes
        )
    }
}

impl StructuredLog for BackendRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            backend = self.backend,
            declared_processes = self.declared_processes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("backend_registered", span_name = name, backend = self.backend)
    }
}

/// Process name could not be resolved to exactly one backend.
///
/// # Log Level
/// `warn!` - Caller error or misconfiguration
pub struct ProcessResolutionFailed<'a> {
    pub process: &'a str,
    pub candidates: usize,
}

impl Display for ProcessResolutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.candidates == 0 {
            write!(f, "No backend handles process '{}'", self.process)
        } else {
            write!(
                f,
                "Process '{}' is claimed by {} backends",
                self.process, self.candidates
            )
        }
    }
}

impl StructuredLog for ProcessResolutionFailed<'_> {
    fn log(&self) {
        tracing::warn!(process = self.process, candidates = self.candidates, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("process_resolution", span_name = name, process = self.process)
    }
}
