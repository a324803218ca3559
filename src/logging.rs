// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Filter directives are taken from, in order:
//! 1. `GEOPROC_LOG` (e.g. `debug`, `geoproc_executor::engine=trace`)
//! 2. `RUST_LOG`
//! 3. the level passed by the caller
//!
//! Thread names are printed, so lines from `process-worker-N` threads and the
//! `execution-sweeper` can be told apart.

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV_VAR: &str = "GEOPROC_LOG";

static INIT: Once = Once::new();

/// Install the global subscriber, writing to stderr. Later calls are no-ops,
/// as is the first one if another subscriber was installed beforehand.
pub fn init_logging(default_level: &str) {
    INIT.call_once(|| {
        let _ = fmt()
            .with_env_filter(env_filter(default_level))
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .try_init();
    });
}

/// Subscriber for tests: output is captured per test and only shown for
/// failing ones (or with `--nocapture`).
#[cfg(test)]
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = fmt()
            .with_env_filter(env_filter("info"))
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}

fn env_filter(default_level: &str) -> EnvFilter {
    std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}
