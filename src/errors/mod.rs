// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod process;

pub use config::ConfigError;
pub use process::{BackendError, ProcessError, ProcessResult};
