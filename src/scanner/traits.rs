//! Probe abstraction and per-port result types.
//!
//! A [`Prober`] performs one connection attempt against one address and
//! classifies the outcome. Concurrency, cancellation and the hard time limit
//! belong to the coordinator, so implementations only describe what a single
//! attempt observed.

use crate::types::Port;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Classification of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeState {
    /// Connection accepted.
    Open,
    /// Connection actively refused.
    Closed,
    /// No answer before the timeout, usually a firewall silently dropping.
    Filtered,
    /// Any other failure, with a human-readable reason.
    Error(String),
    /// The probe was in flight when the scan was cancelled.
    Cancelled,
}

impl ProbeState {
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Open => StateKind::Open,
            Self::Closed => StateKind::Closed,
            Self::Filtered => StateKind::Filtered,
            Self::Error(_) => StateKind::Error,
            Self::Cancelled => StateKind::Cancelled,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Error(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

/// Data-less view of [`ProbeState`], used for counting and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Open,
    Closed,
    Filtered,
    Error,
    Cancelled,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Filtered => "filtered",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.pad(s)
    }
}

/// What a single connection attempt observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub state: ProbeState,
    /// Banner read from an open port, when banner grabbing is enabled.
    pub banner: Option<String>,
}

impl ProbeOutcome {
    pub fn new(state: ProbeState) -> Self {
        Self {
            state,
            banner: None,
        }
    }

    pub fn open() -> Self {
        Self::new(ProbeState::Open)
    }

    pub fn closed() -> Self {
        Self::new(ProbeState::Closed)
    }

    pub fn filtered() -> Self {
        Self::new(ProbeState::Filtered)
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(ProbeState::Error(reason.into()))
    }

    pub fn with_banner(mut self, banner: Option<String>) -> Self {
        self.banner = banner;
        self
    }
}

/// Result of probing a single port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ProbeRecord")]
pub struct ProbeResult {
    pub port: Port,
    pub state: ProbeState,
    /// Time from dispatch to classification.
    pub elapsed: Duration,
    /// Well-known service name for the port, if any.
    pub service: Option<&'static str>,
    pub banner: Option<String>,
}

impl ProbeResult {
    pub fn new(port: Port, state: ProbeState, elapsed: Duration) -> Self {
        Self {
            port,
            state,
            elapsed,
            service: crate::services::service_name(port.as_u16()),
            banner: None,
        }
    }

    pub fn from_outcome(port: Port, outcome: ProbeOutcome, elapsed: Duration) -> Self {
        Self {
            banner: outcome.banner,
            ..Self::new(port, outcome.state, elapsed)
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == ProbeState::Open
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Flat, machine-readable form of a [`ProbeResult`].
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRecord {
    pub port: u16,
    pub state: StateKind,
    pub elapsed_ms: u64,
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

impl From<ProbeResult> for ProbeRecord {
    fn from(result: ProbeResult) -> Self {
        Self {
            port: result.port.as_u16(),
            state: result.state.kind(),
            elapsed_ms: result.elapsed_ms(),
            reason: result.state.reason().map(str::to_owned),
            service: result.service,
            banner: result.banner,
        }
    }
}

/// A single-connection capability.
///
/// `timeout` bounds connection establishment and an attempt that has not
/// connected in time should be reported as filtered. The coordinator also
/// enforces [`Prober::time_budget`] as a hard limit on the whole call and
/// classifies a probe that overruns it as filtered.
///
/// # Example
///
/// ```ignore
/// use portprobe::scanner::{ProbeOutcome, Prober};
///
/// struct AlwaysOpen;
///
/// #[async_trait::async_trait]
/// impl Prober for AlwaysOpen {
///     fn name(&self) -> &'static str { "always-open" }
///     async fn probe(&self, _addr: SocketAddr, _timeout: Duration) -> ProbeOutcome {
///         ProbeOutcome::open()
///     }
/// }
/// ```
#[async_trait]
pub trait Prober: Send + Sync {
    /// Short name used in logs and report headers.
    fn name(&self) -> &'static str;

    /// Upper bound on one `probe` call given its connect timeout. Probers
    /// that keep working after connecting (banner reads, retries) extend it.
    fn time_budget(&self, timeout: Duration) -> Duration {
        timeout
    }

    /// Attempt one connection to `addr` and classify it.
    async fn probe(&self, addr: SocketAddr, timeout: Duration) -> ProbeOutcome;
}

#[async_trait]
impl<P: Prober + ?Sized> Prober for std::sync::Arc<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn time_budget(&self, timeout: Duration) -> Duration {
        (**self).time_budget(timeout)
    }

    async fn probe(&self, addr: SocketAddr, timeout: Duration) -> ProbeOutcome {
        (**self).probe(addr, timeout).await
    }
}
