// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::ReportMode;

const LONG_ABOUT: &str = "\
Run SSH commands on multiple servers concurrently.
Servers can be passed via -s/--servers, or STDIN.

Output Modes (-m/--mode):
  host      shows server before each outputted line, default
  plain     show output as-is
  check     show server and ✓ on success, x on failure, no output
  check-yes show server and ✓ on success, nothing otherwise
  check-no  show server and x on failure, nothing otherwise
  exit      show server and exit code, no output
  silent    show nothing

Exit Code:
  sshmux will return an exit code of 0, if at least one command
  completed and all completed commands were successful.

  This can be overwritten by using --exit-ok.";

/// Command-line arguments for `sshmux`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sshmux",
    version,
    about = "Run SSH commands on multiple servers concurrently.",
    long_about = LONG_ABOUT
)]
pub struct CliArgs {
    /// Use pseudo-terminal.
    #[arg(short = 't', long)]
    pub tty: bool,

    /// Comma separated servers.
    #[arg(short = 's', long, value_name = "SERVERS")]
    pub servers: Option<String>,

    /// Concurrent SSH processes [default: 16].
    #[arg(short = 'w', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Default user.
    #[arg(short = 'u', long, value_name = "USER")]
    pub user: Option<String>,

    /// Default port.
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<i64>,

    /// Output mode [default: host].
    #[arg(short = 'm', long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Ignore server command errors.
    #[arg(long)]
    pub exit_ok: bool,

    /// Exit code counted as success (repeatable; replaces the default `0`).
    #[arg(long = "ok-code", value_name = "CODE", allow_negative_numbers = true)]
    pub ok_codes: Vec<i32>,

    /// SSH client binary to invoke.
    #[arg(long, value_name = "PROGRAM")]
    pub ssh_program: Option<String>,

    /// Path to a TOML file with defaults (else `SSHMUX_CONFIG`).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SSHMUX_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Command to execute.
    #[arg(value_name = "COMMAND")]
    pub command: String,
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

impl CliArgs {
    /// The `--mode` flag, parsed.
    pub fn report_mode(&self) -> Option<Result<ReportMode, String>> {
        self.mode.as_deref().map(str::parse)
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
