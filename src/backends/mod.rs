// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Process backend implementations.
//!
//! A backend is one family of processes behind the [`ProcessBackend`] trait.
//! The [`ProcessCatalog`] picks the backend for a process name; the execution
//! manager never needs to know which kind it got.
//!
//! # Available Backends
//!
//! ## Local Backend
//! In-process Rust processes registered under a namespace:
//! - **Built-ins**: `echo`, `sum`, `delay`, `chain` from [`local::LocalProcessFactory`]
//! - **Closures**: any `Fn(&ProcessRequest) -> Result<ParameterMap, BackendError>`
//! - **Use Case**: processes shipped with the server, testing
//!
//! ## Remote Backend
//! Delegates whole namespaces to another service through a [`remote::RemoteClient`]:
//! - **Polling**: progress forwarded at a fixed interval
//! - **Cancellation**: local cancellation dismisses the remote job
//! - **Use Case**: processing clusters, legacy services
//!
//! ## Stub Backend (Test-Only)
//! Closure-backed and namespace-wide test backends plus a helper building
//! stand-alone requests. NOT available in production builds.
//!
//! # Examples
//!
//! ## Using Local Backend
//! ```rust
//! use std::sync::Arc;
//! use geoproc_executor::backends::local::LocalBackend;
//! use geoproc_executor::catalog::ProcessCatalog;
//!
//! let catalog = ProcessCatalog::new()
//!     .with_backend(Arc::new(LocalBackend::with_builtin("geo")))?;
//! assert!(catalog.resolve(&"geo:sum".into()).is_ok());
//! # Ok::<(), geoproc_executor::errors::ProcessError>(())
//! ```
//!
//! [`ProcessBackend`]: crate::traits::ProcessBackend
//! [`ProcessCatalog`]: crate::catalog::ProcessCatalog

pub mod local;
pub mod remote;
#[cfg(test)]
pub mod stub;
