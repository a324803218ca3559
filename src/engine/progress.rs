// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Progress reporting and cooperative cancellation between a running process
//! and the execution manager.
//!
//! Two halves meet here:
//!
//! * [`ProgressListener`] is supplied by whoever submits the process (usually
//!   the request dispatcher). It is told about lifecycle events and may itself
//!   ask for cancellation through [`ProgressListener::is_cancelled`].
//! * [`ProcessMonitor`] is what the backend holds while it runs. It records
//!   percent-complete into the execution and exposes the cancellation flag.
//!
//! Cancellation is advisory. The manager only raises a flag; a backend that
//! never calls [`ProcessMonitor::is_cancelled`] (or one of the helpers built
//! on it) runs to completion. Backends should check at natural checkpoints,
//! for example once per processed feature or tile.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::engine::result_channel::ResultChannel;
use crate::errors::BackendError;

/// Granularity of cancellable waits.
const CANCEL_POLL_SLICE: Duration = Duration::from_millis(10);

/// Caller-side observer of one execution.
///
/// Callbacks run on whichever thread executes the process, so they must be
/// cheap and must not block.
pub trait ProgressListener: Send + Sync {
    fn started(&self) {}

    fn progress(&self, _percent: f32) {}

    fn completed(&self) {}

    fn failed(&self, _error: &(dyn std::error::Error + 'static)) {}

    /// Dispatcher-side dismissal. Checked together with the manager's flag.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressListener;

impl ProgressListener for NullProgressListener {}

/// Handle given to a backend for the duration of one run.
#[derive(Clone)]
pub struct ProcessMonitor {
    token: CancellationToken,
    listener: Arc<dyn ProgressListener>,
    channel: Option<Arc<ResultChannel>>,
}

impl ProcessMonitor {
    /// Monitor for a queued execution; progress lands in its result channel.
    pub(crate) fn queued(
        channel: Arc<ResultChannel>,
        token: CancellationToken,
        listener: Arc<dyn ProgressListener>,
    ) -> Self {
        Self {
            token,
            listener,
            channel: Some(channel),
        }
    }

    /// Monitor for a chained execution, which has no registry entry.
    pub(crate) fn chained(token: CancellationToken, listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            token,
            listener,
            channel: None,
        }
    }

    /// A monitor attached to nothing, for driving a backend directly.
    pub fn detached() -> Self {
        Self::chained(CancellationToken::new(), Arc::new(NullProgressListener))
    }

    /// Monitor for a nested chained call. Cancelling the parent cancels the
    /// child; the child's progress is not reported as the parent's.
    pub(crate) fn nested(&self) -> Self {
        Self::chained(
            self.token.child_token(),
            Arc::new(NestedListener {
                parent: self.clone(),
            }),
        )
    }

    pub fn report_progress(&self, percent: f32) {
        if let Some(channel) = &self.channel {
            channel.report_progress(percent);
        }
        self.listener.progress(percent);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.listener.is_cancelled()
    }

    /// `Err(BackendError::Cancelled)` once cancellation was requested, for use
    /// with `?` at checkpoints.
    pub fn checkpoint(&self) -> Result<(), BackendError> {
        if self.is_cancelled() {
            Err(BackendError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early if cancellation is requested.
    pub fn wait_or_cancel(&self, duration: Duration) -> Result<(), BackendError> {
        let deadline = Instant::now() + duration;
        loop {
            self.checkpoint()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(CANCEL_POLL_SLICE.min(deadline - now));
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn listener(&self) -> &Arc<dyn ProgressListener> {
        &self.listener
    }
}

impl fmt::Debug for ProcessMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessMonitor")
            .field("cancelled", &self.is_cancelled())
            .field("tracks_progress", &self.channel.is_some())
            .finish()
    }
}

struct NestedListener {
    parent: ProcessMonitor,
}

impl ProgressListener for NestedListener {
    fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingListener {
        progress: Mutex<Vec<f32>>,
        dismissed: AtomicBool,
    }

    impl ProgressListener for RecordingListener {
        fn progress(&self, percent: f32) {
            self.progress.lock().push(percent);
        }

        fn is_cancelled(&self) -> bool {
            self.dismissed.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_progress_reaches_channel_and_listener() {
        let channel = Arc::new(ResultChannel::new());
        channel.start();
        let listener = Arc::new(RecordingListener::default());
        let monitor = ProcessMonitor::queued(
            Arc::clone(&channel),
            CancellationToken::new(),
            listener.clone(),
        );

        monitor.report_progress(25.0);
        monitor.report_progress(75.0);

        assert_eq!(channel.progress(), 75.0);
        assert_eq!(*listener.progress.lock(), vec![25.0, 75.0]);
    }

    #[test]
    fn test_cancellation_from_token_or_listener() {
        let token = CancellationToken::new();
        let listener = Arc::new(RecordingListener::default());
        let monitor = ProcessMonitor::chained(token.clone(), listener.clone());
        assert!(monitor.checkpoint().is_ok());

        listener.dismissed.store(true, Ordering::SeqCst);
        assert!(matches!(monitor.checkpoint(), Err(BackendError::Cancelled)));

        listener.dismissed.store(false, Ordering::SeqCst);
        token.cancel();
        assert!(monitor.is_cancelled());
    }

    #[test]
    fn test_nested_monitor_follows_parent() {
        let listener = Arc::new(RecordingListener::default());
        let parent = ProcessMonitor::chained(CancellationToken::new(), listener.clone());
        let child = parent.nested();

        child.report_progress(50.0);
        assert!(listener.progress.lock().is_empty());

        listener.dismissed.store(true, Ordering::SeqCst);
        assert!(child.is_cancelled());

        let parent = ProcessMonitor::detached();
        let child = parent.nested();
        parent.cancellation_token().cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_wait_or_cancel_returns_early() {
        let monitor = ProcessMonitor::detached();
        let token = monitor.cancellation_token().clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            token.cancel();
        });

        let started = Instant::now();
        let result = monitor.wait_or_cancel(Duration::from_secs(10));
        canceller.join().unwrap();

        assert!(matches!(result, Err(BackendError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
