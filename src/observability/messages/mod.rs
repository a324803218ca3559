// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Organization
//!
//! * `execution` - execution lifecycle events
//! * `pool` - worker pool events
//! * `catalog` - backend registration and lookup events
//!
//! # Usage Pattern
//!
//! ```rust
//! use geoproc_executor::observability::messages::pool::WorkerPoolStarted;
//!
//! let msg = WorkerPoolStarted {
//!     workers: 4,
//!     max_queued: 256,
//!     foreground_weight: 4,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

use std::fmt::Display;
use tracing::Span;

pub mod catalog;
pub mod execution;
pub mod pool;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog: Display {
    /// Emit the message as a single event.
    fn log(&self);

    /// A span carrying the message's fields, for work that follows the event.
    fn span(&self, name: &str) -> Span;
}
