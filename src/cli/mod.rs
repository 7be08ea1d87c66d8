//! CLI argument parsing for hostexec.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// hostexec: run a local task descriptor as a sandboxed payload.
///
/// The task is compiled with its arguments into a private executable, run
/// once, and its JSON output printed as a result report on stdout.
#[derive(Parser, Debug)]
#[command(name = "hostexec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to $HOSTEXEC_CONFIG, then /etc/hostexec/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the directory task descriptors are looked up under.
    #[arg(long, global = true, value_name = "DIR")]
    pub task_root: Option<PathBuf>,

    /// Override the directory payloads are staged in.
    #[arg(long, global = true, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence when set).
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for hostexec.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a task once and print its result report.
    ///
    /// The process exits with the code of the run's status.
    Run(RunArgs),

    /// Resolve a task and print its descriptor path.
    Check(CheckArgs),

    /// Print the effective configuration as YAML.
    Config,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Task identifier, relative to the task root.
    pub task: String,

    /// Task argument as KEY=VALUE; VALUE is read as JSON when it parses.
    #[arg(short, long = "arg", value_name = "KEY=VALUE")]
    pub args: Vec<String>,

    /// Task arguments as a JSON object; --arg values are merged on top.
    #[arg(long, value_name = "JSON")]
    pub args_json: Option<String>,

    /// Payload deadline in seconds (0 disables it).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Task identifier, relative to the task root.
    pub task: String,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
