// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use crate::backends::stub::FnBackend;
    use crate::config::{load_and_validate_config, Config, ConfigFormat, RuntimeBuilder};
    use crate::engine::{NullProgressListener, ParameterMap, ProcessName};
    use crate::errors::ProcessError;

    /// The shipped YAML config loads and describes two local backends
    #[test]
    fn test_executor_yaml_loading() {
        let config = load_and_validate_config("configs/executor.yaml").unwrap();

        assert_eq!(config.executor.get_worker_threads(), 4);
        assert_eq!(config.executor.get_max_queued(), 128);
        assert_eq!(config.executor.get_foreground_weight(), 4);
        assert!(config.reclamation.is_enabled());
        assert_eq!(config.reclamation.get_abandoned_after(), Duration::from_secs(900));
        assert_eq!(config.local_backends.len(), 2);
        assert_eq!(config.local_backends[0].namespace, "geo");
        assert!(config.local_backends[0].processes.is_empty());
        assert_eq!(config.local_backends[1].processes, vec!["echo", "delay"]);
    }

    /// The TOML config carries the same structure
    #[test]
    fn test_executor_toml_loading() {
        let config = load_and_validate_config("configs/executor.toml").unwrap();

        assert_eq!(config.executor.get_worker_threads(), 1);
        assert_eq!(config.executor.get_max_queued(), 8);
        assert_eq!(config.executor.get_foreground_weight(), 2);
        assert!(!config.reclamation.is_enabled());
        assert_eq!(config.local_backends[0].processes, vec!["sum", "chain"]);
    }

    /// A manager built from YAML resolves exactly the configured processes
    #[test]
    fn test_runtime_from_yaml_resolves_configured_processes() {
        let config = load_and_validate_config("configs/executor.yaml").unwrap();
        let manager = RuntimeBuilder::build(&config).unwrap();

        assert_eq!(manager.worker_threads(), 4);
        let catalog = manager.catalog();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.resolve(&ProcessName::parse("geo:sum")).is_ok());
        assert!(catalog.resolve(&ProcessName::parse("diag:delay")).is_ok());
        assert!(matches!(
            catalog.resolve(&ProcessName::parse("diag:sum")),
            Err(ProcessError::UnknownProcess { .. })
        ));

        manager.shutdown();
    }

    /// End to end: TOML config, queued chain process, chained sum inside it
    #[test]
    fn test_runtime_from_toml_runs_chain() {
        let config = load_and_validate_config("configs/executor.toml").unwrap();
        let manager = RuntimeBuilder::build(&config).unwrap();

        let inputs = ParameterMap::from([
            ("process".to_string(), json!("geo:sum")),
            ("inputs".to_string(), json!({ "values": [1.5, 2.5] })),
        ]);
        let id = manager
            .submit("geo:chain", inputs, Arc::new(NullProgressListener), false)
            .unwrap();
        let outputs = manager.get_output(&id, Duration::from_secs(10)).unwrap();

        assert_eq!(outputs["result"]["sum"], json!(4.0));
        manager.shutdown();
    }

    /// Backends of a configured runtime get scratch space under the
    /// configured root, removed once the outcome is consumed
    #[test]
    fn test_runtime_scratch_dir_under_configured_root() {
        let root = tempfile::tempdir().unwrap();
        let yaml = format!(
            "executor:\n  worker_threads: 1\nreclamation:\n  enabled: false\nresources:\n  scratch_root: {}\n",
            root.path().join("scratch").display()
        );
        let config = Config::parse(&yaml, ConfigFormat::Yaml).unwrap();

        let mut catalog = RuntimeBuilder::catalog_from_config(&config).unwrap();
        catalog
            .register(Arc::new(FnBackend::new("test:spool", |request| {
                let dir = request.scratch_dir()?;
                std::fs::write(dir.join("coverage.tif"), b"raster")?;
                Ok(ParameterMap::from([(
                    "dir".to_string(),
                    json!(dir.to_string_lossy()),
                )]))
            })))
            .unwrap();
        let manager = RuntimeBuilder::from_config(&config, catalog).unwrap();

        let id = manager
            .submit("test:spool", ParameterMap::new(), Arc::new(NullProgressListener), false)
            .unwrap();
        let outputs = manager.get_output(&id, Duration::from_secs(10)).unwrap();

        let dir = std::path::PathBuf::from(outputs["dir"].as_str().unwrap());
        assert!(dir.starts_with(root.path()));
        assert!(!dir.exists(), "scratch space is released with the execution");
        manager.shutdown();
    }

    /// A zero-thread pool is refused even when the config was never validated
    #[test]
    fn test_runtime_rejects_zero_worker_threads() {
        let config = Config::parse("executor:\n  worker_threads: 0\n", ConfigFormat::Yaml).unwrap();
        let err = RuntimeBuilder::build(&config).unwrap_err();
        assert!(err.to_string().contains("executor.worker_threads"));
    }
}
