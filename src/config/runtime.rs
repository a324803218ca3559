// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::local::LocalBackend;
use crate::catalog::ProcessCatalog;
use crate::config::{validate_config, Config};
use crate::engine::{ExecutionManager, Reclamation};
use crate::resources::TempResourceManager;

/// Runtime builder - turns a configuration into a ready execution manager.
///
/// # Examples
///
/// ## Building a manager from configuration
/// ```
/// use geoproc_executor::config::{Config, ConfigFormat, RuntimeBuilder};
///
/// let config = Config::parse(
///     "executor:\n  worker_threads: 1\nlocal_backends:\n  - name: builtin\n    namespace: geo\n",
///     ConfigFormat::Yaml,
/// ).unwrap();
///
/// let manager = RuntimeBuilder::build(&config).unwrap();
/// assert_eq!(manager.worker_threads(), 1);
/// assert!(manager.catalog().resolve(&"geo:echo".into()).is_ok());
/// manager.shutdown();
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Catalog holding the configured local backends.
    pub fn catalog_from_config(cfg: &Config) -> anyhow::Result<ProcessCatalog> {
        let mut catalog = ProcessCatalog::new();
        for backend in &cfg.local_backends {
            let local = if backend.processes.is_empty() {
                LocalBackend::with_builtin(&backend.namespace)
            } else {
                LocalBackend::with_processes(&backend.namespace, &backend.processes)?
            };
            catalog.register(Arc::new(local.named(&backend.name)))?;
        }
        Ok(catalog)
    }

    /// Manager over `catalog`, sized and tuned by `cfg`, with per-execution
    /// scratch directories. `cfg` is validated first.
    pub fn from_config(cfg: &Config, catalog: ProcessCatalog) -> anyhow::Result<ExecutionManager> {
        validate_config(cfg)?;

        let resources = match &cfg.resources.scratch_root {
            Some(root) => TempResourceManager::with_root(root),
            None => TempResourceManager::new(),
        };

        let reclamation = cfg.reclamation.is_enabled().then(|| Reclamation {
            abandoned_after: cfg.reclamation.get_abandoned_after(),
            sweep_interval: cfg.reclamation.get_sweep_interval(),
        });

        let manager = ExecutionManager::builder(catalog)
            .worker_threads(cfg.executor.get_worker_threads())
            .max_queued(cfg.executor.get_max_queued())
            .foreground_weight(cfg.executor.get_foreground_weight())
            .resources(Arc::new(resources))
            .reclamation(reclamation)
            .build()?;
        Ok(manager)
    }

    /// [`RuntimeBuilder::catalog_from_config`] followed by [`RuntimeBuilder::from_config`].
    pub fn build(cfg: &Config) -> anyhow::Result<ExecutionManager> {
        let catalog = Self::catalog_from_config(cfg)?;
        Self::from_config(cfg, catalog)
    }
}
