// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // process backends: local, remote
pub mod catalog;       // process name -> backend resolution
pub mod config;        // config loading + runtime wiring
pub mod context;       // ambient request state across threads
pub mod dispatch;      // async facade for tokio dispatchers
pub mod engine;        // execution manager, worker pool, registry
pub mod errors;        // error handling
pub mod logging;
pub mod observability;
pub mod resources;     // per-execution temporary storage
pub mod traits;        // backend and resource abstractions
