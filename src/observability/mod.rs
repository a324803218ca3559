// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every diagnostic and operational log line emitted by the executor is a
//! message struct from [`messages`]. Each one implements `Display` for the
//! human-readable text and [`messages::StructuredLog`] to emit itself with
//! typed fields at its own level, so call sites never format ad-hoc strings.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::execution` - submission, lifecycle and reclamation of executions
//! * `messages::pool` - worker pool startup, panics and shutdown
//! * `messages::catalog` - backend registration and process resolution
//!
//! # Usage
//!
//! ```rust
//! use geoproc_executor::observability::messages::{execution::ExecutionRejected, StructuredLog};
//!
//! let msg = ExecutionRejected {
//!     process: "gs:Buffer",
//!     queued: 256,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
