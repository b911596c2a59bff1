//! # portprobe - A Concurrent TCP Port Scanner
//!
//! portprobe classifies every requested TCP port on a single host as open,
//! closed, filtered or error by attempting a full handshake, with a hard cap
//! on how many attempts are in flight.
//!
//! ## Features
//!
//! - **Bounded concurrency**: never more than `concurrency` probes at once
//! - **Deterministic reports**: one result per port, sorted ascending
//! - **Cancellation**: a cancelled scan hands back everything it finished
//! - **Rate limiting, retries and banner grabbing** as opt-in extras
//! - **Multiple Output Formats**: Plain text, JSON, JSON lines and CSV
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portprobe::{scan, ScanOptions};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), portprobe::ScanError> {
//!     let options = ScanOptions::new(100, Duration::from_millis(500));
//!     let report = scan("127.0.0.1", "20-25,80,443", options, CancellationToken::new()).await?;
//!
//!     for result in report.results() {
//!         println!("{}/tcp  {}  [{}ms]", result.port, result.state, result.elapsed_ms());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, port specifications, targets and scan IDs
//! - [`scanner`] - The [`Coordinator`], the [`Prober`] trait and its implementations
//! - [`config`] - Settings file and built-in scan profiles
//! - [`error`] - Error types
//! - [`output`] - Report rendering

pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ScanError};
pub use scanner::{
    scan, Coordinator, PartialReport, ProbeResult, ProbeState, Prober, ScanOptions, ScanReport,
};
pub use types::{Port, PortSpec, ScanId, ScanTarget, TargetSpec};
