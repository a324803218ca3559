// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while loading and validating executor configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file extension does not map to a known format.
    #[error("Unsupported config format '{extension}' (expected .yaml, .yml or .toml)")]
    UnsupportedFormat { extension: String },

    /// A field parsed fine but holds a value the executor cannot run with.
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
