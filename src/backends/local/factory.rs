use std::sync::Arc;

use super::processes::*;
use super::Process;
use crate::errors::{ProcessError, ProcessResult};

/// Factory for creating built-in local (in-process) processes
pub struct LocalProcessFactory;

impl LocalProcessFactory {
    /// Create a process instance by implementation name
    ///
    /// - "echo" -> EchoProcess (outputs = inputs)
    /// - "sum" -> SumProcess (adds up a numeric array)
    /// - "delay" -> DelayProcess (sleeps, reporting progress, cancellable)
    /// - "chain" -> ChainProcess (runs another process as a chained step)
    pub fn create_process(impl_name: &str) -> ProcessResult<Arc<dyn Process>> {
        match impl_name {
            "echo" => Ok(Arc::new(EchoProcess)),
            "sum" => Ok(Arc::new(SumProcess)),
            "delay" => Ok(Arc::new(DelayProcess::default())),
            "chain" => Ok(Arc::new(ChainProcess)),
            _ => Err(ProcessError::UnknownProcess {
                name: impl_name.to_string(),
            }),
        }
    }

    /// List all available local process implementations
    pub fn list_available_implementations() -> Vec<&'static str> {
        vec!["echo", "sum", "delay", "chain"]
    }

    /// Check if an implementation is available
    pub fn is_implementation_available(impl_name: &str) -> bool {
        Self::list_available_implementations().contains(&impl_name)
    }
}
