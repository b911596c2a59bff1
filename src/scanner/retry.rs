//! Caller-level retry policy.
//!
//! Wraps any [`Prober`] and repeats attempts whose outcome was inconclusive
//! (filtered or error). Open and closed are definitive answers and are
//! returned as soon as they are seen.

use crate::scanner::traits::{ProbeOutcome, ProbeState, Prober};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::debug;

/// A prober that retries inconclusive outcomes of an inner prober.
#[derive(Debug, Clone)]
pub struct RetryingProber<P> {
    inner: P,
    retries: u32,
}

impl<P: Prober> RetryingProber<P> {
    /// Allow up to `retries` extra attempts per port.
    pub fn new(inner: P, retries: u32) -> Self {
        Self { inner, retries }
    }

    fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

fn is_inconclusive(outcome: &ProbeOutcome) -> bool {
    matches!(outcome.state, ProbeState::Filtered | ProbeState::Error(_))
}

#[async_trait]
impl<P: Prober> Prober for RetryingProber<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn time_budget(&self, timeout: Duration) -> Duration {
        self.inner
            .time_budget(timeout)
            .checked_mul(self.attempts())
            .unwrap_or(Duration::MAX)
    }

    async fn probe(&self, addr: SocketAddr, timeout: Duration) -> ProbeOutcome {
        let mut outcome = self.inner.probe(addr, timeout).await;
        for attempt in 1..self.attempts() {
            if !is_inconclusive(&outcome) {
                break;
            }
            debug!(%addr, attempt, state = %outcome.state, "retrying probe");
            outcome = self.inner.probe(addr, timeout).await;
        }
        outcome
    }
}
