// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Run front-end asset tasks, composed in series and parallel, and rerun them on file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run.
    ///
    /// Default: `[config].default_task` (itself defaulting to `default`).
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `ASSETPIPE_CONFIG`, else `Assetpipe.toml` in the current
    /// working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// After the task finishes, keep watching the configured paths.
    #[arg(long)]
    pub watch: bool,

    /// Print registered tasks and exit.
    #[arg(long, conflicts_with = "dry_run")]
    pub list: bool,

    /// Parse + validate, print the task tree, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
