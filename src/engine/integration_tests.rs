// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::json;

use crate::backends::local::LocalBackend;
use crate::backends::stub::FnBackend;
use crate::catalog::ProcessCatalog;
use crate::context::{self, ContextSnapshot};
use crate::engine::{
    ExecutionManager, ExecutionStatus, NullProgressListener, ParameterMap, ProgressListener,
    Reclamation,
};
use crate::errors::{BackendError, ProcessError};
use crate::resources::TempResourceManager;
use crate::traits::ProcessRequest;

/// Integration tests for the execution manager using real worker threads
#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(10);

    /// One-shot latch a backend can block on.
    #[derive(Default)]
    struct Gate {
        open: Mutex<bool>,
        changed: Condvar,
    }

    impl Gate {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn open(&self) {
            *self.open.lock() = true;
            self.changed.notify_all();
        }

        fn wait(&self, timeout: Duration) -> bool {
            let mut open = self.open.lock();
            if !*open {
                self.changed.wait_for(&mut open, timeout);
            }
            *open
        }

        /// Block until opened, giving up early if the execution is cancelled.
        fn wait_cancellable(&self, request: &ProcessRequest) -> Result<(), BackendError> {
            while !self.wait(Duration::from_millis(5)) {
                request.checkpoint()?;
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingListener {
        started: AtomicUsize,
        completed: AtomicUsize,
    }

    impl ProgressListener for CountingListener {
        fn started(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn completed(&self) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn listener() -> Arc<dyn ProgressListener> {
        Arc::new(NullProgressListener)
    }

    fn label(value: &str) -> ParameterMap {
        ParameterMap::from([("label".to_string(), json!(value))])
    }

    /// `test:block` waits for `release` after opening `entered`.
    fn blocking_backend(entered: Arc<Gate>, release: Arc<Gate>) -> FnBackend {
        FnBackend::new("test:block", move |request| {
            entered.open();
            release.wait_cancellable(request)?;
            Ok(request.inputs().clone())
        })
    }

    fn manager(catalog: ProcessCatalog, workers: usize) -> ExecutionManager {
        ExecutionManager::builder(catalog)
            .worker_threads(workers)
            .reclamation(None)
            .build()
            .unwrap()
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    fn rank(status: ExecutionStatus) -> u8 {
        match status {
            ExecutionStatus::Queued => 0,
            ExecutionStatus::Running => 1,
            _ => 2,
        }
    }

    #[test]
    fn test_status_only_moves_forward() {
        let (entered, release) = (Gate::new(), Gate::new());
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(blocking_backend(entered.clone(), release.clone())))
            .unwrap()
            .with_backend(Arc::new(FnBackend::new("test:slow", |request| {
                for step in 1..=5 {
                    request.monitor().wait_or_cancel(Duration::from_millis(5))?;
                    request.report_progress(step as f32 * 20.0);
                }
                Ok(ParameterMap::new())
            })))
            .unwrap();
        let manager = manager(catalog, 1);

        let blocker = manager.submit("test:block", ParameterMap::new(), listener(), false).unwrap();
        assert!(entered.wait(LONG));
        let target = manager.submit("test:slow", ParameterMap::new(), listener(), false).unwrap();
        assert_eq!(manager.status(&target).unwrap().status, ExecutionStatus::Queued);

        release.open();
        let mut observed = Vec::new();
        let mut progress = Vec::new();
        let settled = wait_until(LONG, || {
            let snapshot = manager.status(&target).unwrap();
            observed.push(snapshot.status);
            progress.push(snapshot.progress);
            snapshot.status.is_terminal()
        });
        assert!(settled);

        assert!(observed.windows(2).all(|w| rank(w[0]) <= rank(w[1])));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(observed.last(), Some(&ExecutionStatus::Succeeded));
        assert_eq!(progress.last(), Some(&100.0));

        manager.get_output(&blocker, LONG).unwrap();
        manager.get_output(&target, LONG).unwrap();
        assert_eq!(manager.tracked(), 0);
    }

    #[test]
    fn test_concurrent_get_output_has_one_winner() {
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(FnBackend::new("test:echo", |request| {
                thread::sleep(Duration::from_millis(20));
                Ok(request.inputs().clone())
            })))
            .unwrap();
        let manager = manager(catalog, 2);
        let id = manager.submit("test:echo", label("once"), listener(), false).unwrap();

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let id = id.clone();
                thread::spawn(move || manager.get_output(&id, LONG))
            })
            .collect();
        let results: Vec<_> = readers.into_iter().map(|r| r.join().unwrap()).collect();

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0]["label"], json!("once"));
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(ProcessError::UnknownExecution { .. }))));
    }

    #[test]
    fn test_cancelled_while_queued_never_runs() {
        let (entered, release) = (Gate::new(), Gate::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_in_backend = Arc::clone(&runs);
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(blocking_backend(entered.clone(), release.clone())))
            .unwrap()
            .with_backend(Arc::new(FnBackend::new("test:count", move |_| {
                runs_in_backend.fetch_add(1, Ordering::SeqCst);
                Ok(ParameterMap::new())
            })))
            .unwrap();
        let manager = manager(catalog, 1);

        let blocker = manager.submit("test:block", ParameterMap::new(), listener(), false).unwrap();
        assert!(entered.wait(LONG));

        let counting = Arc::new(CountingListener::default());
        let target = manager
            .submit("test:count", ParameterMap::new(), counting.clone(), true)
            .unwrap();
        assert_eq!(manager.queued(), 1);

        manager.cancel(&target).unwrap();
        assert_eq!(manager.status(&target).unwrap().status, ExecutionStatus::Cancelled);
        assert_eq!(manager.queued(), 0);

        release.open();
        manager.get_output(&blocker, LONG).unwrap();
        assert!(matches!(
            manager.get_output(&target, LONG),
            Err(ProcessError::Cancelled { .. })
        ));

        // A later job on the same worker proves the cancelled one was skipped
        let after = manager.submit("test:count", ParameterMap::new(), listener(), false).unwrap();
        manager.get_output(&after, LONG).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(counting.started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_running_execution() {
        let (entered, release) = (Gate::new(), Gate::new());
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(blocking_backend(entered.clone(), release)))
            .unwrap();
        let manager = manager(catalog, 1);

        let id = manager.submit("test:block", ParameterMap::new(), listener(), false).unwrap();
        assert!(entered.wait(LONG));
        assert_eq!(manager.status(&id).unwrap().status, ExecutionStatus::Running);

        manager.cancel(&id).unwrap();
        assert!(matches!(manager.get_output(&id, LONG), Err(ProcessError::Cancelled { .. })));
    }

    #[test]
    fn test_nested_chained_calls_do_not_deadlock_single_worker() {
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(FnBackend::new("test:inner", |_| {
                let name = thread::current().name().unwrap_or_default().to_string();
                Ok(ParameterMap::from([("thread".to_string(), json!(name))]))
            })))
            .unwrap()
            .with_backend(Arc::new(FnBackend::new("test:outer", |request| {
                let inner = request.run_chained("test:inner", ParameterMap::new())?;
                let name = thread::current().name().unwrap_or_default().to_string();
                Ok(ParameterMap::from([
                    ("outer_thread".to_string(), json!(name)),
                    ("inner_thread".to_string(), inner["thread"].clone()),
                ]))
            })))
            .unwrap();
        let manager = manager(catalog, 1);

        let ids: Vec<_> = (0..4)
            .map(|_| manager.submit("test:outer", ParameterMap::new(), listener(), false).unwrap())
            .collect();

        for id in &ids {
            let outputs = manager.get_output(id, LONG).unwrap();
            assert_eq!(outputs["outer_thread"], json!("process-worker-0"));
            assert_eq!(outputs["inner_thread"], outputs["outer_thread"]);
        }
    }

    #[test]
    fn test_chain_process_through_local_backend() {
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(LocalBackend::with_builtin("geo")))
            .unwrap();
        let manager = manager(catalog, 1);

        let inputs = ParameterMap::from([
            ("process".to_string(), json!("geo:chain")),
            (
                "inputs".to_string(),
                json!({ "process": "geo:sum", "inputs": { "values": [1, 2, 3, 4] } }),
            ),
        ]);
        let ids: Vec<_> = (0..3)
            .map(|_| manager.submit("geo:chain", inputs.clone(), listener(), true).unwrap())
            .collect();

        for id in &ids {
            let outputs = manager.get_output(id, LONG).unwrap();
            assert_eq!(outputs["result"]["result"]["sum"], json!(10.0));
        }

        let missing = ParameterMap::from([("process".to_string(), json!("geo:nope"))]);
        let id = manager.submit("geo:chain", missing, listener(), false).unwrap();
        let err = manager.get_output(&id, LONG).unwrap_err();
        assert!(matches!(err, ProcessError::BackendFailure { .. }));
        assert!(err.to_string().contains("geo:chain"));
    }

    #[test]
    fn test_background_not_starved_by_foreground() {
        let (entered, release) = (Gate::new(), Gate::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_in_backend = Arc::clone(&order);
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(blocking_backend(entered.clone(), release.clone())))
            .unwrap()
            .with_backend(Arc::new(FnBackend::new("test:record", move |request| {
                let label = request.require_input("label")?.clone();
                order_in_backend.lock().push(label);
                Ok(ParameterMap::new())
            })))
            .unwrap();
        let manager = ExecutionManager::builder(catalog)
            .worker_threads(1)
            .foreground_weight(2)
            .reclamation(None)
            .build()
            .unwrap();

        let blocker = manager.submit("test:block", ParameterMap::new(), listener(), false).unwrap();
        assert!(entered.wait(LONG));

        let mut ids = Vec::new();
        for n in 1..=5 {
            ids.push(
                manager
                    .submit("test:record", label(&format!("fg{n}")), listener(), false)
                    .unwrap(),
            );
        }
        ids.push(manager.submit("test:record", label("bg"), listener(), true).unwrap());

        release.open();
        manager.get_output(&blocker, LONG).unwrap();
        for id in &ids {
            manager.get_output(id, LONG).unwrap();
        }

        let order = order.lock().clone();
        assert_eq!(
            order,
            vec![
                json!("fg1"),
                json!("fg2"),
                json!("bg"),
                json!("fg3"),
                json!("fg4"),
                json!("fg5")
            ]
        );
    }

    #[test]
    fn test_queue_full_rejects_and_registers_nothing() {
        let (entered, release) = (Gate::new(), Gate::new());
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(blocking_backend(entered.clone(), release.clone())))
            .unwrap();
        let manager = ExecutionManager::builder(catalog)
            .worker_threads(1)
            .max_queued(1)
            .reclamation(None)
            .build()
            .unwrap();

        let running = manager.submit("test:block", ParameterMap::new(), listener(), false).unwrap();
        assert!(entered.wait(LONG));
        let waiting = manager.submit("test:block", ParameterMap::new(), listener(), true).unwrap();

        let err = manager
            .submit("test:block", ParameterMap::new(), listener(), false)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Overloaded { queued: 1, .. }));
        assert!(err.is_retryable());
        assert_eq!(manager.tracked(), 2);

        release.open();
        manager.get_output(&running, LONG).unwrap();
        manager.get_output(&waiting, LONG).unwrap();
    }

    #[test]
    fn test_context_reaches_worker_and_does_not_leak() {
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(FnBackend::new("test:whoami", |_| {
                let ambient = context::capture();
                Ok(ParameterMap::from([
                    ("principal".to_string(), json!(ambient.principal())),
                    ("tenant".to_string(), json!(ambient.attribute("tenant"))),
                    (
                        "execution_id".to_string(),
                        json!(context::current_execution_id().map(|id| id.to_string())),
                    ),
                ]))
            })))
            .unwrap();
        let manager = manager(catalog, 1);

        let id = context::with_context(
            ContextSnapshot::new()
                .with_principal("alice")
                .with_attribute("tenant", "acme"),
            || manager.submit("test:whoami", ParameterMap::new(), listener(), false),
        )
        .unwrap();
        let outputs = manager.get_output(&id, LONG).unwrap();
        assert_eq!(outputs["principal"], json!("alice"));
        assert_eq!(outputs["tenant"], json!("acme"));
        assert_eq!(outputs["execution_id"], json!(id.to_string()));
        assert!(context::capture().is_empty());

        // Same worker thread, submitted without any context
        let id = manager.submit("test:whoami", ParameterMap::new(), listener(), false).unwrap();
        let outputs = manager.get_output(&id, LONG).unwrap();
        assert_eq!(outputs["principal"], json!(null));
        assert_eq!(outputs["tenant"], json!(null));
        assert_eq!(outputs["execution_id"], json!(id.to_string()));
    }

    #[test]
    fn test_still_running_then_outputs() {
        let (entered, release) = (Gate::new(), Gate::new());
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(blocking_backend(entered.clone(), release.clone())))
            .unwrap();
        let manager = manager(catalog, 1);
        let counting = Arc::new(CountingListener::default());

        let id = manager
            .submit("test:block", label("late"), counting.clone(), false)
            .unwrap();
        assert!(entered.wait(LONG));

        let early = manager.get_output(&id, Duration::from_millis(20));
        assert!(matches!(early, Err(ProcessError::StillRunning { .. })));
        assert_eq!(manager.status(&id).unwrap().status, ExecutionStatus::Running);

        release.open();
        let outputs = manager.get_output(&id, LONG).unwrap();
        assert_eq!(outputs["label"], json!("late"));
        assert_eq!(counting.started.load(Ordering::SeqCst), 1);
        assert_eq!(counting.completed.load(Ordering::SeqCst), 1);
        assert!(matches!(
            manager.status(&id),
            Err(ProcessError::UnknownExecution { .. })
        ));
    }

    #[test]
    fn test_scratch_space_follows_execution_lifetime() {
        let resources = Arc::new(TempResourceManager::new());
        let for_inner = Arc::clone(&resources);
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(FnBackend::new("test:scratch", move |_| {
                let id = context::current_execution_id()
                    .ok_or_else(|| BackendError::msg("no ambient execution id"))?;
                let dir = for_inner.scratch_dir(&id)?;
                std::fs::write(dir.join("tile.tif"), b"raster")?;
                Ok(ParameterMap::from([(
                    "dir".to_string(),
                    json!(dir.to_string_lossy()),
                )]))
            })))
            .unwrap()
            .with_backend(Arc::new(FnBackend::new("test:wrapper", |request| {
                Ok(request.run_chained("test:scratch", ParameterMap::new())?)
            })))
            .unwrap();
        let manager = ExecutionManager::builder(catalog)
            .worker_threads(1)
            .resources(resources.clone())
            .reclamation(None)
            .build()
            .unwrap();

        // Queued wrapper: the nested call shares its id, so the directory
        // lives until the wrapper's outcome is consumed
        let id = manager.submit("test:wrapper", ParameterMap::new(), listener(), false).unwrap();
        assert!(wait_until(LONG, || manager.status(&id).unwrap().status.is_terminal()));
        assert!(resources.has_scratch(&id));

        let outputs = manager.get_output(&id, LONG).unwrap();
        let dir = std::path::PathBuf::from(outputs["dir"].as_str().unwrap());
        assert!(!dir.exists());
        assert!(!resources.has_scratch(&id));

        // Top-level chained call: released as soon as it returns
        let outputs = manager
            .submit_chained("test:scratch", ParameterMap::new(), listener())
            .unwrap();
        let dir = std::path::PathBuf::from(outputs["dir"].as_str().unwrap());
        assert!(!dir.exists());
        assert_eq!(resources.live_executions(), 0);
    }

    #[test]
    fn test_reclaim_abandoned_outcomes() {
        let resources = Arc::new(TempResourceManager::new());
        let for_backend = Arc::clone(&resources);
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(FnBackend::new("test:scratch", move |request| {
                for_backend.scratch_dir(request.execution_id())?;
                Ok(ParameterMap::new())
            })))
            .unwrap();
        let manager = ExecutionManager::builder(catalog)
            .worker_threads(1)
            .resources(resources.clone())
            .reclamation(None)
            .build()
            .unwrap();

        let id = manager.submit("test:scratch", ParameterMap::new(), listener(), true).unwrap();
        assert!(wait_until(LONG, || manager.status(&id).unwrap().status.is_terminal()));

        assert_eq!(manager.reclaim_abandoned(Duration::from_secs(3600)), 0);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(manager.reclaim_abandoned(Duration::from_millis(10)), 1);

        assert_eq!(manager.tracked(), 0);
        assert!(!resources.has_scratch(&id));
        assert!(matches!(
            manager.get_output(&id, Duration::ZERO),
            Err(ProcessError::UnknownExecution { .. })
        ));
    }

    #[test]
    fn test_sweeper_reclaims_in_background() {
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(FnBackend::new("test:echo", |r| Ok(r.inputs().clone()))))
            .unwrap();
        let manager = ExecutionManager::builder(catalog)
            .worker_threads(1)
            .reclamation(Some(Reclamation {
                abandoned_after: Duration::from_millis(10),
                sweep_interval: Duration::from_millis(20),
            }))
            .build()
            .unwrap();

        let id = manager.submit("test:echo", ParameterMap::new(), listener(), false).unwrap();
        assert!(wait_until(LONG, || manager.tracked() == 0));
        assert!(manager.get_output(&id, Duration::ZERO).is_err());
        manager.shutdown();
    }

    #[test]
    fn test_shutdown_cancels_queued_and_running() {
        let (entered, release) = (Gate::new(), Gate::new());
        let catalog = ProcessCatalog::new()
            .with_backend(Arc::new(blocking_backend(entered.clone(), release)))
            .unwrap();
        let manager = manager(catalog, 1);

        let running = manager.submit("test:block", ParameterMap::new(), listener(), false).unwrap();
        assert!(entered.wait(LONG));
        let queued: Vec<_> = (0..3)
            .map(|_| manager.submit("test:block", ParameterMap::new(), listener(), true).unwrap())
            .collect();

        manager.shutdown();

        assert!(matches!(
            manager.get_output(&running, LONG),
            Err(ProcessError::Cancelled { .. })
        ));
        for id in &queued {
            assert!(matches!(
                manager.get_output(id, Duration::ZERO),
                Err(ProcessError::Cancelled { .. })
            ));
        }
        assert!(matches!(
            manager.submit("test:block", ParameterMap::new(), listener(), false),
            Err(ProcessError::ShuttingDown)
        ));
    }
}
