// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ambient request-scoped state and its transfer across thread boundaries.
//!
//! Code that runs a process reads ambient state (the security principal, the
//! request locale, and the identifier of the execution it belongs to, used by
//! resource managers to tag temporary files) from a thread-local slot. When an
//! execution moves to a worker thread, that state does not follow by itself.
//!
//! The submitting thread calls [`capture`] to take an immutable
//! [`ContextSnapshot`]. The snapshot travels with the unit of work, and the
//! executing thread calls [`ContextSnapshot::apply`], which returns a
//! [`ContextGuard`]. Dropping the guard restores whatever the thread held
//! before, on success, error or unwinding panic alike, so pooled threads never
//! keep a stale context.
//!
//! # Examples
//!
//! ```rust
//! use geoproc_executor::context::{self, ContextSnapshot};
//!
//! let snapshot = ContextSnapshot::new().with_principal("alice");
//! {
//!     let _guard = snapshot.apply();
//!     assert_eq!(context::capture().principal(), Some("alice"));
//! }
//! assert_eq!(context::capture().principal(), None);
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::engine::ExecutionId;

thread_local! {
    static CURRENT: RefCell<ContextSnapshot> = RefCell::new(ContextSnapshot::default());
}

/// Immutable copy of the ambient state of one thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSnapshot {
    principal: Option<String>,
    locale: Option<String>,
    execution_id: Option<ExecutionId>,
    attributes: BTreeMap<String, String>,
}

impl ContextSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_execution_id(mut self, id: ExecutionId) -> Self {
        self.execution_id = Some(id);
        self
    }

    /// Free-form request attribute (tenant, request id, ...).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn execution_id(&self) -> Option<&ExecutionId> {
        self.execution_id.as_ref()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self == &ContextSnapshot::default()
    }

    /// Install this snapshot as the current thread's context until the
    /// returned guard is dropped.
    #[must_use = "the context is restored as soon as the guard is dropped"]
    pub fn apply(self) -> ContextGuard {
        let previous = CURRENT.with(|slot| slot.replace(self));
        ContextGuard {
            previous: Some(previous),
            _not_send: PhantomData,
        }
    }
}

/// Restores the previous context of the thread on drop.
///
/// Not `Send`: it must be dropped on the thread that created it.
#[derive(Debug)]
pub struct ContextGuard {
    previous: Option<ContextSnapshot>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            // try_with: the thread-local may already be gone during thread teardown
            let _ = CURRENT.try_with(|slot| slot.replace(previous));
        }
    }
}

/// Snapshot the current thread's ambient state.
pub fn capture() -> ContextSnapshot {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Execution the current thread is working for, if any.
pub fn current_execution_id() -> Option<ExecutionId> {
    CURRENT.with(|slot| slot.borrow().execution_id.clone())
}

/// Run `f` with `snapshot` applied, restoring the previous context afterwards.
pub fn with_context<R>(snapshot: ContextSnapshot, f: impl FnOnce() -> R) -> R {
    let _guard = snapshot.apply();
    f()
}
