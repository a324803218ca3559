// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::json;
use std::time::{Duration, Instant};

use crate::backends::local::Process;
use crate::engine::ParameterMap;
use crate::errors::BackendError;
use crate::traits::ProcessRequest;

/// Delay process - waits `millis` milliseconds in steps
///
/// Reports progress after every step and stops early on cancellation.
/// Outputs `slept_ms`.
pub struct DelayProcess {
    steps: u32,
}

impl Default for DelayProcess {
    fn default() -> Self {
        Self { steps: 10 }
    }
}

impl DelayProcess {
    pub fn with_steps(steps: u32) -> Self {
        Self { steps: steps.max(1) }
    }
}

impl Process for DelayProcess {
    fn execute(&self, request: &ProcessRequest) -> Result<ParameterMap, BackendError> {
        let millis = request
            .require_input("millis")?
            .as_u64()
            .ok_or_else(|| BackendError::msg("input 'millis' must be a non-negative integer"))?;

        let started = Instant::now();
        let step = Duration::from_millis(millis) / self.steps;
        for completed in 1..=self.steps {
            request.monitor().wait_or_cancel(step)?;
            request.report_progress(completed as f32 * 100.0 / self.steps as f32);
        }

        Ok(ParameterMap::from([(
            "slept_ms".to_string(),
            json!(started.elapsed().as_millis() as u64),
        )]))
    }
}
