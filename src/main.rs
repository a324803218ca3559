// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use geoproc_executor::config::{load_and_validate_config, Config, LocalBackendConfig, RuntimeBuilder};
use geoproc_executor::dispatch::AsyncExecutionClient;
use geoproc_executor::engine::{NullProgressListener, ParameterMap, ProgressListener};
use geoproc_executor::logging::init_logging;
use serde_json::json;

const OUTPUT_DEADLINE: Duration = Duration::from_secs(30);

/// Prints progress of the background run as it arrives.
struct ConsoleProgress {
    label: &'static str,
}

impl ProgressListener for ConsoleProgress {
    fn started(&self) {
        println!("   ▶️  {} started", self.label);
    }

    fn progress(&self, percent: f32) {
        println!("   ⏳ {}: {:.0}%", self.label, percent);
    }

    fn completed(&self) {
        println!("   ✅ {} completed", self.label);
    }

    fn failed(&self, error: &(dyn std::error::Error + 'static)) {
        println!("   ❌ {} failed: {}", self.label, error);
    }
}

#[tokio::main]
async fn main() {
    init_logging("warn");

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        eprintln!("Usage: {} [config.yaml|config.toml ...]", args[0]);
        eprintln!("Example: {} configs/executor.yaml", args[0]);
        eprintln!("Without a config file a single local backend serves the 'geo' namespace.");
        std::process::exit(1);
    }

    println!("🚀 Process Execution Demo");
    println!("═══════════════════════════");

    let config_files = &args[1..];
    if config_files.is_empty() {
        if let Err(e) = run_scenario("built-in defaults", default_config()).await {
            eprintln!("❌ Demo failed: {}", e);
            std::process::exit(1);
        }
    }

    for (i, config_file) in config_files.iter().enumerate() {
        if i > 0 {
            println!("\n{}", "─".repeat(80));
        }

        let outcome = match load_and_validate_config(config_file) {
            Ok(config) => run_scenario(config_file, config).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = outcome {
            eprintln!("❌ Failed to run {}: {}", config_file, e);
        }
    }

    println!("\n🎉 Demo complete!");
}

fn default_config() -> Config {
    Config {
        local_backends: vec![LocalBackendConfig {
            name: "builtin".to_string(),
            namespace: "geo".to_string(),
            processes: Vec::new(),
        }],
        ..Config::default()
    }
}

/// Foreground, background and chained runs against the first local backend
/// that serves the process each step needs.
async fn run_scenario(source: &str, config: Config) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let manager = RuntimeBuilder::build(&config)?;
    let client = AsyncExecutionClient::new(manager.clone());

    println!("📋 Configuration: {}", source);
    println!("⚙️  Worker threads: {}", manager.worker_threads());
    println!("🗂️  Processes:");
    for process in manager.catalog().declared_processes() {
        println!("   • {}", process);
    }

    let namespace = |local: &str| {
        config
            .local_backends
            .iter()
            .find(|b| b.processes.is_empty() || b.processes.iter().any(|p| p == local))
            .map(|b| format!("{}:{}", b.namespace, local))
    };

    if let Some(sum) = namespace("sum") {
        println!("\n🔢 Foreground {}", sum);
        let inputs = ParameterMap::from([("values".to_string(), json!([1.5, 2.5, 3.0, 4.0]))]);
        let id = client.submit(sum.as_str(), inputs, Arc::new(NullProgressListener), false)?;
        let outputs = client.wait_for_output(&id, OUTPUT_DEADLINE).await?;
        println!("   {} → sum = {}", id, outputs["sum"]);
    }

    if let Some(delay) = namespace("delay") {
        println!("\n🌙 Background {}", delay);
        let inputs = ParameterMap::from([("millis".to_string(), json!(300))]);
        let listener = Arc::new(ConsoleProgress { label: "delay" });
        let id = client.submit(delay.as_str(), inputs, listener, true)?;
        let snapshot = client.status(&id)?;
        println!("   {} is {}", id, snapshot.status);
        let outputs = client.wait_for_output(&id, OUTPUT_DEADLINE).await?;
        println!("   slept {} ms", outputs["slept_ms"]);

        println!("\n🛑 Cancelling a long {}", delay);
        let inputs = ParameterMap::from([("millis".to_string(), json!(60_000))]);
        let id = client.submit(delay.as_str(), inputs, Arc::new(NullProgressListener), true)?;
        client.cancel(&id)?;
        match client.wait_for_output(&id, OUTPUT_DEADLINE).await {
            Err(e) if e.is_cancelled() => println!("   {} cancelled", id),
            other => println!("   unexpected outcome: {:?}", other),
        }
    }

    if let (Some(chain), Some(sum)) = (namespace("chain"), namespace("sum")) {
        println!("\n🔗 Chained {} → {}", chain, sum);
        let inputs = ParameterMap::from([
            ("process".to_string(), json!(sum)),
            ("inputs".to_string(), json!({ "values": [10, 20, 30] })),
        ]);
        let outputs = client
            .run_chained(chain.as_str(), inputs, Arc::new(NullProgressListener))
            .await?;
        println!("   result = {}", outputs["result"]);
    }

    manager.shutdown();
    println!("\n⏱️  Total Time: {:?}", start_time.elapsed());
    Ok(())
}
