//! Scan reports and the aggregator that builds them.
//!
//! A [`ReportBuilder`] is owned by exactly one coordinator run and is the only
//! place results are written. It keys results by port, so the finished
//! report is sorted ascending and holds one entry per requested port no
//! matter in which order the probes completed.

use crate::scanner::traits::{ProbeResult, ProbeState, StateKind};
use crate::types::{Port, ScanId, ScanTarget};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Per-state counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub open: usize,
    pub closed: usize,
    pub filtered: usize,
    pub error: usize,
}

impl Summary {
    fn from_results<'a>(results: impl IntoIterator<Item = &'a ProbeResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.state.kind() {
                StateKind::Open => summary.open += 1,
                StateKind::Closed => summary.closed += 1,
                StateKind::Filtered => summary.filtered += 1,
                StateKind::Error => summary.error += 1,
                StateKind::Cancelled => {}
            }
        }
        summary
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Metadata shared by full and partial reports.
#[derive(Debug, Clone, Serialize)]
pub struct ScanInfo {
    pub id: ScanId,
    pub target: ScanTarget,
    pub scan_type: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

/// The immutable result of a completed scan.
///
/// Holds exactly one [`ProbeResult`] per requested port, sorted by port.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    #[serde(flatten)]
    info: ScanInfo,
    summary: Summary,
    results: Vec<ProbeResult>,
}

impl ScanReport {
    pub fn info(&self) -> &ScanInfo {
        &self.info
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Results sorted by port ascending.
    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, port: Port) -> Option<&ProbeResult> {
        self.results
            .binary_search_by_key(&port, |r| r.port)
            .ok()
            .map(|i| &self.results[i])
    }

    pub fn open_ports(&self) -> impl Iterator<Item = Port> + '_ {
        self.results.iter().filter(|r| r.is_open()).map(|r| r.port)
    }
}

/// What a cancelled scan had achieved.
///
/// Never mistaken for a full report: it is only reachable through
/// [`ScanError::Cancelled`](crate::error::ScanError::Cancelled).
#[derive(Debug, Clone, Serialize)]
pub struct PartialReport {
    #[serde(flatten)]
    pub info: ScanInfo,
    /// Number of ports the scan was asked to probe.
    pub requested: usize,
    pub summary: Summary,
    /// Probes that reached a classification, sorted by port.
    pub completed: Vec<ProbeResult>,
    /// Probes that were in flight when the scan was cancelled.
    pub interrupted: Vec<ProbeResult>,
    /// Ports that were never dispatched.
    pub not_started: Vec<Port>,
}

impl PartialReport {
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }
}

/// Single-writer aggregation buffer for one scan run.
#[derive(Debug)]
pub struct ReportBuilder {
    id: ScanId,
    target: ScanTarget,
    scan_type: &'static str,
    started_at: DateTime<Utc>,
    clock: Instant,
    requested: BTreeSet<Port>,
    results: BTreeMap<Port, ProbeResult>,
}

impl ReportBuilder {
    pub fn new(
        id: ScanId,
        target: ScanTarget,
        scan_type: &'static str,
        ports: &[Port],
    ) -> Self {
        Self {
            id,
            target,
            scan_type,
            started_at: Utc::now(),
            clock: Instant::now(),
            requested: ports.iter().copied().collect(),
            results: BTreeMap::new(),
        }
    }

    /// Number of distinct ports this scan covers.
    pub fn requested(&self) -> usize {
        self.requested.len()
    }

    /// Record a result. The first result for a port wins; results for ports
    /// that were not requested are dropped.
    pub fn record(&mut self, result: ProbeResult) {
        if !self.requested.contains(&result.port) {
            warn!(port = %result.port, "dropping result for unrequested port");
            return;
        }
        if self.results.contains_key(&result.port) {
            warn!(port = %result.port, "dropping duplicate result");
            return;
        }
        self.results.insert(result.port, result);
    }

    /// Whether every requested port has a definitive (non-cancelled) result.
    pub fn is_complete(&self) -> bool {
        self.results.len() == self.requested.len()
            && self.results.values().all(|r| r.state != ProbeState::Cancelled)
    }

    fn info(&self) -> ScanInfo {
        ScanInfo {
            id: self.id,
            target: self.target.clone(),
            scan_type: self.scan_type,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration: self.clock.elapsed(),
        }
    }

    /// Seal the report. A requested port without a result (its probe task
    /// died) is recorded as an error so the one-result-per-port invariant
    /// holds.
    pub fn finish(mut self) -> ScanReport {
        let missing: Vec<Port> = self
            .requested
            .iter()
            .filter(|port| !self.results.contains_key(port))
            .copied()
            .collect();
        for port in missing {
            warn!(%port, "probe produced no result");
            self.results.insert(
                port,
                ProbeResult::new(
                    port,
                    ProbeState::Error("probe task failed before reporting".to_string()),
                    Duration::ZERO,
                ),
            );
        }

        let info = self.info();
        let results: Vec<ProbeResult> = self.results.into_values().collect();
        ScanReport {
            info,
            summary: Summary::from_results(&results),
            results,
        }
    }

    /// Split what has been collected so far into a partial report.
    pub fn into_partial(self) -> PartialReport {
        let info = self.info();
        let requested = self.requested.len();
        let not_started = self
            .requested
            .iter()
            .filter(|port| !self.results.contains_key(port))
            .copied()
            .collect();
        let (interrupted, completed): (Vec<_>, Vec<_>) = self
            .results
            .into_values()
            .partition(|r| r.state == ProbeState::Cancelled);

        PartialReport {
            info,
            requested,
            summary: Summary::from_results(&completed),
            completed,
            interrupted,
            not_started,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn port(n: u16) -> Port {
        Port::new(n).unwrap()
    }

    fn builder(ports: &[u16]) -> ReportBuilder {
        let ports: Vec<Port> = ports.iter().map(|&p| port(p)).collect();
        ReportBuilder::new(
            ScanId::new(),
            ScanTarget::from(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            "test",
            &ports,
        )
    }

    fn result(n: u16, state: ProbeState) -> ProbeResult {
        ProbeResult::new(port(n), state, Duration::from_millis(n as u64))
    }

    #[test]
    fn test_finish_sorts_by_port() {
        let mut b = builder(&[443, 22, 80]);
        b.record(result(80, ProbeState::Closed));
        b.record(result(443, ProbeState::Open));
        b.record(result(22, ProbeState::Filtered));
        assert!(b.is_complete());

        let report = b.finish();
        let ports: Vec<u16> = report.results().iter().map(|r| r.port.as_u16()).collect();
        assert_eq!(ports, vec![22, 80, 443]);
        assert_eq!(
            report.summary(),
            Summary {
                open: 1,
                closed: 1,
                filtered: 1,
                error: 0
            }
        );
        assert_eq!(report.get(port(443)).unwrap().state, ProbeState::Open);
        assert_eq!(report.open_ports().collect::<Vec<_>>(), vec![port(443)]);
    }

    #[test]
    fn test_duplicates_and_strays_dropped() {
        let mut b = builder(&[80]);
        b.record(result(80, ProbeState::Open));
        b.record(result(80, ProbeState::Closed));
        b.record(result(81, ProbeState::Open));

        let report = b.finish();
        assert_eq!(report.len(), 1);
        assert_eq!(report.results()[0].state, ProbeState::Open);
    }

    #[test]
    fn test_finish_fills_missing_ports_with_errors() {
        let mut b = builder(&[1, 2, 3]);
        b.record(result(2, ProbeState::Closed));
        assert!(!b.is_complete());

        let report = b.finish();
        assert_eq!(report.len(), 3);
        assert_eq!(report.summary().error, 2);
        assert!(report.results()[0].state.reason().is_some());
    }

    #[test]
    fn test_partial_report_split() {
        let mut b = builder(&[10, 20, 30, 40]);
        b.record(result(30, ProbeState::Open));
        b.record(result(10, ProbeState::Closed));
        b.record(result(20, ProbeState::Cancelled));

        let partial = b.into_partial();
        assert_eq!(partial.requested, 4);
        assert_eq!(partial.completed_count(), 2);
        assert_eq!(partial.completed[0].port, port(10));
        assert_eq!(partial.completed[1].port, port(30));
        assert_eq!(partial.interrupted.len(), 1);
        assert_eq!(partial.not_started, vec![port(40)]);
    }

    #[test]
    fn test_report_json_shape() {
        let mut b = builder(&[22]);
        b.record(result(22, ProbeState::Open));
        let json = serde_json::to_value(b.finish()).unwrap();

        assert_eq!(json["scan_type"], "test");
        assert_eq!(json["target"]["ip"], "127.0.0.1");
        assert!(json["duration_ms"].is_u64());
        assert_eq!(json["summary"]["open"], 1);
        assert_eq!(json["results"][0]["port"], 22);
    }
}
