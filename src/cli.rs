// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `testdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "testdag",
    version,
    about = "Inspect, validate and render test dependency graphs.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to scan for annotated test files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub scan: String,

    /// Glob selecting test files (repeatable).
    ///
    /// If omitted, the `[discover].patterns` from the config file are used.
    #[arg(long = "pattern", value_name = "GLOB")]
    pub patterns: Vec<String>,

    /// Glob excluding files from the scan (repeatable). Appended to the
    /// config's `[discover].exclude`.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Testdag.toml` in the current working directory. A missing
    /// file falls back to built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Testdag.toml")]
    pub config: String,

    /// Results snapshot used to annotate graph nodes with statuses.
    #[arg(long, value_name = "PATH")]
    pub results: Option<String>,

    /// Output format for the dependency graph.
    #[arg(long, value_enum, default_value_t = OutputFormat::Ascii)]
    pub format: OutputFormat,

    /// Check the discovered graph for cycles and unresolved references and
    /// exit non-zero if any are found, instead of rendering.
    #[arg(long)]
    pub validate: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TESTDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Graph output format as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented dependents tree, roots first.
    Ascii,
    /// Mermaid `graph TD` flowchart.
    Mermaid,
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
