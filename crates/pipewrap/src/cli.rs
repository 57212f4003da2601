//! Command-line interface and startup validation.
//!
//! Validation failures abort before any resource is acquired: no child
//! process is spawned and no capture handle is opened.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use rotolog::{RetentionPolicy, RotationPolicy};

/// Default ceiling on the log directory size, in megabytes.
pub const DEFAULT_MAX_DIR_MB: u64 = 100;

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("cmd is empty")]
    EmptyCommand,
    #[error("count must be at least 1, got {0}")]
    InvalidCount(u64),
    #[error("log directory {0:?} does not exist")]
    LogDirMissing(PathBuf),
    #[error("log path {0:?} is not a directory")]
    LogDirNotDirectory(PathBuf),
}

/// Capture a stream of records into bounded, rotated files.
#[derive(Parser, Debug, Clone)]
#[command(name = "pipewrap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Capture stdout lines of a child process, one record per line.
    Pipe(PipeArgs),
    /// Capture packets from a live network interface into pcap files.
    #[cfg(feature = "live-capture")]
    Live(LiveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PipeArgs {
    /// Command line to run; the first word is the program.
    #[arg(long)]
    pub cmd: String,

    #[command(flatten)]
    pub shared: SharedArgs,
}

impl PipeArgs {
    /// Splits the command line on whitespace, rejecting an empty command.
    pub fn command_line(&self) -> Result<Vec<String>, CliError> {
        let argv: Vec<String> = self.cmd.split_whitespace().map(str::to_string).collect();
        if argv.is_empty() {
            return Err(CliError::EmptyCommand);
        }
        Ok(argv)
    }
}

#[cfg(feature = "live-capture")]
#[derive(Args, Debug, Clone)]
pub struct LiveArgs {
    /// Network interface to capture from.
    #[arg(short = 'i', long)]
    pub interface: String,

    /// Optional BPF capture filter expression.
    #[arg(long)]
    pub filter: Option<String>,

    #[command(flatten)]
    pub shared: SharedArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SharedArgs {
    /// Records per output file before rotating to a new one.
    #[arg(long)]
    pub count: u64,

    /// Directory receiving output files; must already exist.
    #[arg(long = "log-dir", default_value = "./")]
    pub log_dir: PathBuf,

    /// Maximum total size of the log directory in megabytes; the oldest
    /// completed file is deleted once the bound is exceeded.
    #[arg(long = "max-dir-mb", default_value_t = DEFAULT_MAX_DIR_MB)]
    pub max_dir_mb: u64,
}

impl SharedArgs {
    pub fn validate(&self) -> Result<(RotationPolicy, RetentionPolicy), CliError> {
        let rotation =
            RotationPolicy::new(self.count).map_err(|_| CliError::InvalidCount(self.count))?;
        match std::fs::metadata(&self.log_dir) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(CliError::LogDirNotDirectory(self.log_dir.clone())),
            Err(_) => return Err(CliError::LogDirMissing(self.log_dir.clone())),
        }
        Ok((rotation, RetentionPolicy::from_megabytes(self.max_dir_mb)))
    }
}
