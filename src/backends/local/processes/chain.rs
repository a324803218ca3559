// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{json, Value};

use crate::backends::local::Process;
use crate::engine::{ParameterMap, ProcessName};
use crate::errors::BackendError;
use crate::traits::ProcessRequest;

/// Chain process - computes its result by running another process
///
/// Inputs: `process` (qualified name) and optional `inputs` (object) for it.
/// The nested process runs synchronously on the current thread; its outputs
/// are returned under `result`.
pub struct ChainProcess;

impl Process for ChainProcess {
    fn execute(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        let target = request
            .require_input("process")?
            .as_str()
            .ok_or_else(|| BackendError::msg("input 'process' must be a string"))?;

        let nested_inputs: ParameterMap = match request.input("inputs") {
            None | Some(Value::Null) => ParameterMap::new(),
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            Some(other) => {
                return Err(BackendError::msg(format!(
                    "input 'inputs' must be an object, got {other}"
                )))
            }
        };

        let outputs = request.run_chained(ProcessName::parse(target), nested_inputs)?;
        Ok(ParameterMap::from([("result".to_string(), json!(outputs))]))
    }
}
