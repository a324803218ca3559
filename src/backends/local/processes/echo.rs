use crate::backends::local::Process;
use crate::engine::ParameterMap;
use crate::errors::BackendError;
use crate::traits::ProcessRequest;

/// Echo process - returns its inputs unchanged
pub struct EchoProcess;

impl Process for EchoProcess {
    fn execute(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        request.checkpoint()?;
        Ok(request.inputs().clone())
    }
}
