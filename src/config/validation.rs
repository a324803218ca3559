use std::collections::HashSet;

use crate::backends::local::LocalProcessFactory;
use crate::config::Config;
use crate::errors::ConfigError;

/// Reject settings the executor cannot run with.
///
/// Checks:
/// * pool size, queue depth and foreground weight are non-zero
/// * the reclamation sweep interval is non-zero
/// * local backend names and namespaces are unique
/// * every listed local process exists
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.executor.worker_threads == Some(0) {
        return Err(invalid("executor.worker_threads", "must be at least 1"));
    }
    if cfg.executor.max_queued == Some(0) {
        return Err(invalid("executor.max_queued", "must be at least 1"));
    }
    if cfg.executor.foreground_weight == Some(0) {
        return Err(invalid("executor.foreground_weight", "must be at least 1"));
    }
    if cfg.reclamation.sweep_interval_secs == Some(0) {
        return Err(invalid("reclamation.sweep_interval_secs", "must be at least 1"));
    }

    let mut names = HashSet::new();
    let mut namespaces = HashSet::new();
    for backend in &cfg.local_backends {
        if !names.insert(backend.name.as_str()) {
            return Err(invalid(
                "local_backends.name",
                format!("duplicate backend name '{}'", backend.name),
            ));
        }
        if backend.namespace.is_empty() || !namespaces.insert(backend.namespace.as_str()) {
            return Err(invalid(
                "local_backends.namespace",
                format!("namespace '{}' is empty or already used", backend.namespace),
            ));
        }
        if let Some(unknown) = backend
            .processes
            .iter()
            .find(|process| !LocalProcessFactory::is_implementation_available(process))
        {
            return Err(invalid(
                "local_backends.processes",
                format!("unknown local process '{}'", unknown),
            ));
        }
    }

    Ok(())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFormat, LocalBackendConfig};

    fn parse(yaml: &str) -> Config {
        Config::parse(yaml, ConfigFormat::Yaml).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let cases = [
            ("executor:\n  worker_threads: 0\n", "executor.worker_threads"),
            ("executor:\n  max_queued: 0\n", "executor.max_queued"),
            ("executor:\n  foreground_weight: 0\n", "executor.foreground_weight"),
            ("reclamation:\n  sweep_interval_secs: 0\n", "reclamation.sweep_interval_secs"),
        ];

        for (yaml, expected) in cases {
            match validate_config(&parse(yaml)) {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_duplicate_namespace_rejected() {
        let mut cfg = Config::default();
        for name in ["a", "b"] {
            cfg.local_backends.push(LocalBackendConfig {
                name: name.to_string(),
                namespace: "geo".to_string(),
                processes: vec![],
            });
        }
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("namespace 'geo'"));
    }

    #[test]
    fn test_unknown_local_process_rejected() {
        let cfg = parse(
            "local_backends:\n  - name: builtin\n    namespace: geo\n    processes: [echo, reproject]\n",
        );
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("unknown local process 'reproject'"));
    }
}
