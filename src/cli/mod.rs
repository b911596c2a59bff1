//! CLI subcommand definitions and handlers.
//!
//! - `portprobe scan <target>` - Scan a target
//! - `portprobe profiles list|show` - Inspect built-in scan profiles

mod profiles;
mod scan;

pub use profiles::ProfilesCommand;
pub use scan::ScanCommand;

use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

/// portprobe - a concurrent TCP connect port scanner.
///
/// Probes every requested port with a full TCP handshake, at most
/// `--concurrency` at a time, and reports each port as open, closed,
/// filtered or error.
#[derive(Parser, Debug)]
#[command(name = "portprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A concurrent TCP port scanner", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a settings file
    #[arg(long, global = true, value_name = "PATH", env = "PORTPROBE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a target for open ports
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// List or inspect built-in scan profiles
    #[command(alias = "p")]
    Profiles(ProfilesCommand),
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// A single JSON document
    Json,
    /// One JSON object per port, one per line
    Jsonl,
    /// CSV with a header row
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Jsonl => write!(f, "jsonl"),
            Self::Csv => write!(f, "csv"),
        }
    }
}
