// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::json;

use crate::backends::local::Process;
use crate::engine::ParameterMap;
use crate::errors::BackendError;
use crate::traits::ProcessRequest;

/// Sum process - adds up the numbers in the `values` input
///
/// Outputs `sum` (as a float) and `count`.
pub struct SumProcess;

impl Process for SumProcess {
    fn execute(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        let values = request
            .require_input("values")?
            .as_array()
            .ok_or_else(|| BackendError::msg("input 'values' must be an array"))?;

        let mut sum = 0.0;
        for (index, value) in values.iter().enumerate() {
            request.checkpoint()?;
            let number = value.as_f64().ok_or_else(|| {
                BackendError::msg(format!("values[{index}] is not a number: {value}"))
            })?;
            sum += number;
            request.report_progress(((index + 1) as f32 / values.len() as f32) * 100.0);
        }

        Ok(ParameterMap::from([
            ("sum".to_string(), json!(sum)),
            ("count".to_string(), json!(values.len())),
        ]))
    }
}
