//! Command implementations for hostexec.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every command returns the process exit code on success;
//! errors carry their own code via [`HarnessError::exit_code`].

use crate::cli::{CheckArgs, Cli, Command, RunArgs};
use hostexec::args::{Arguments, parse_assignment};
use hostexec::error::{HarnessError, Result};
use hostexec::events::{EventSink, FanoutSink, NdjsonSink, SocketSink, TracingSink};
use hostexec::exit_codes;
use hostexec::{Harness, HarnessConfig, ScriptCompiler};
use serde_json::Value;
use std::sync::Arc;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let config = effective_config(&cli)?;

    match cli.command {
        Command::Run(args) => cmd_run(config, args),
        Command::Check(args) => cmd_check(config, args),
        Command::Config => cmd_config(&config),
    }
}

/// Load the config file and apply global flag overrides on top.
fn effective_config(cli: &Cli) -> Result<HarnessConfig> {
    let mut config = HarnessConfig::load_or_default(cli.config.as_deref())?;

    if let Some(task_root) = &cli.task_root {
        config.task_root = task_root.clone();
    }
    if let Some(staging_dir) = &cli.staging_dir {
        config.staging_dir = staging_dir.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Build the event sink chain: tracing always, the agent socket when it is
/// listening, and the NDJSON log when configured.
fn build_sink(config: &HarnessConfig) -> Arc<dyn EventSink> {
    let mut sink = FanoutSink::new().with(Arc::new(TracingSink));

    if config.log_socket_path.exists() {
        sink = sink.with(Arc::new(SocketSink::new(&config.log_socket_path)));
    } else {
        tracing::debug!(
            path = %config.log_socket_path.display(),
            "event socket not present, events go to the log only"
        );
    }

    if let Some(path) = &config.event_log {
        sink = sink.with(Arc::new(NdjsonSink::new(path)));
    }

    Arc::new(sink)
}

fn build_harness(config: &HarnessConfig) -> Harness {
    Harness::from_config(config, Arc::new(ScriptCompiler), build_sink(config))
}

// ============================================================================
// Command Implementations
// ============================================================================

fn cmd_run(mut config: HarnessConfig, args: RunArgs) -> Result<i32> {
    if let Some(timeout) = args.timeout {
        config.timeout_seconds = timeout;
    }

    let arguments = collect_arguments(args.args_json.as_deref(), &args.args)?;
    let harness = build_harness(&config);

    let result = harness.run(&args.task, arguments);
    let report = serde_json::to_string_pretty(&result)
        .map_err(|e| HarnessError::Config(format!("failed to serialize result: {}", e)))?;
    println!("{}", report);

    Ok(result.status.exit_code())
}

fn cmd_check(config: HarnessConfig, args: CheckArgs) -> Result<i32> {
    let harness = build_harness(&config);
    let descriptor = harness.resolve(&args.task)?;

    println!("{}", descriptor.display());
    Ok(exit_codes::SUCCESS)
}

fn cmd_config(config: &HarnessConfig) -> Result<i32> {
    print!("{}", config.to_yaml()?);
    Ok(exit_codes::SUCCESS)
}

/// Merge `--args-json` and `--arg KEY=VALUE` into one argument mapping.
///
/// Assignments are applied in order on top of the JSON object, so later
/// values win.
fn collect_arguments(json: Option<&str>, assignments: &[String]) -> Result<Arguments> {
    let mut arguments = match json {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(HarnessError::Config(
                    "--args-json must be a JSON object".to_string(),
                ));
            }
            Err(e) => {
                return Err(HarnessError::Config(format!(
                    "--args-json is not valid JSON: {}",
                    e
                )));
            }
        },
        None => Arguments::new(),
    };

    for assignment in assignments {
        let (key, value) = parse_assignment(assignment)?;
        arguments.insert(key, value);
    }

    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_collect_arguments_merges_in_order() {
        let args = collect_arguments(
            Some(r#"{"path": "/old", "force": false}"#),
            &["path=/data".to_string(), "count=3".to_string()],
        )
        .unwrap();

        assert_eq!(args["path"], "/data");
        assert_eq!(args["force"], false);
        assert_eq!(args["count"], 3);
    }

    #[test]
    fn test_collect_arguments_without_input_is_empty() {
        assert!(collect_arguments(None, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_collect_arguments_rejects_non_object_json() {
        let err = collect_arguments(Some("[1, 2]"), &[]).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
        assert_eq!(err.exit_code(), exit_codes::USAGE_ERROR);

        let err = collect_arguments(Some("{oops"), &[]).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_collect_arguments_rejects_bad_assignment() {
        let err = collect_arguments(None, &["novalue".to_string()]).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        std::fs::write(
            &config_path,
            "task_root: /srv/tasks\nstaging_dir: /var/tmp\npublisher_id: agent\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "hostexec",
            "--config",
            config_path.to_str().unwrap(),
            "--staging-dir",
            "/run/staging",
            "config",
        ])
        .unwrap();
        let config = effective_config(&cli).unwrap();

        assert_eq!(config.task_root, PathBuf::from("/srv/tasks"));
        assert_eq!(config.staging_dir, PathBuf::from("/run/staging"));
        assert_eq!(config.publisher_id, "agent");
    }

    #[test]
    fn test_relative_override_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        std::fs::write(&config_path, "publisher_id: agent\n").unwrap();

        let cli = Cli::try_parse_from([
            "hostexec",
            "--config",
            config_path.to_str().unwrap(),
            "--task-root",
            "tasks",
            "config",
        ])
        .unwrap();

        assert!(matches!(effective_config(&cli), Err(HarnessError::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_status_as_exit_code() {
        let temp = TempDir::new().unwrap();
        let task_root = temp.path().join("tasks");
        std::fs::create_dir_all(&task_root).unwrap();
        std::fs::write(task_root.join("echo"), "#!/bin/sh\necho '{\"ok\": true}'\n").unwrap();

        let config = HarnessConfig {
            task_root: task_root.clone(),
            staging_dir: temp.path().to_path_buf(),
            log_socket_path: temp.path().join("absent.sock"),
            event_log: Some(temp.path().join("events.ndjson")),
            ..HarnessConfig::default()
        };

        let run = |task: &str, args: Vec<String>| {
            cmd_run(
                config.clone(),
                RunArgs {
                    task: task.to_string(),
                    args,
                    args_json: None,
                    timeout: Some(10),
                },
            )
            .unwrap()
        };

        assert_eq!(run("echo", vec!["x=1".to_string()]), exit_codes::SUCCESS);
        assert_eq!(run("echo", vec![]), exit_codes::INVALID_INPUT);
        assert_eq!(run("missing", vec!["x=1".to_string()]), exit_codes::TASK_NOT_FOUND);

        // The empty-arguments failure reached the NDJSON log.
        let log = std::fs::read_to_string(temp.path().join("events.ndjson")).unwrap();
        assert!(log.contains("Empty argument dictionary"));
        for line in log.lines() {
            let event: Value = serde_json::from_str(line).unwrap();
            assert_eq!(event["publisher"], "hostexec");
        }
    }

    #[test]
    fn test_check_missing_task_is_an_error() {
        let temp = TempDir::new().unwrap();
        let config = HarnessConfig {
            task_root: temp.path().to_path_buf(),
            log_socket_path: temp.path().join("absent.sock"),
            ..HarnessConfig::default()
        };

        let err = cmd_check(
            config,
            CheckArgs {
                task: "nope".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::TASK_NOT_FOUND);
    }
}
