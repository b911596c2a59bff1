//! Scanner module - the scan coordinator and its probers.
//!
//! [`Coordinator`] fans probes out over a tokio runtime with a hard limit on
//! how many are in flight, collects their results into a [`ReportBuilder`]
//! and hands back an immutable [`ScanReport`] sorted by port.

mod rate_limiter;
mod report;
mod retry;
mod tcp;
mod traits;

pub use rate_limiter::RateLimiter;
pub use report::{PartialReport, ReportBuilder, ScanInfo, ScanReport, Summary};
pub use retry::RetryingProber;
pub use tcp::TcpConnectProber;
pub use traits::{ProbeOutcome, ProbeRecord, ProbeResult, ProbeState, Prober, StateKind};

use crate::error::{ScanError, ScanResult};
use crate::types::{Port, PortSpec, ScanId, ScanTarget, TargetSpec};
use indicatif::ProgressBar;
use rand::seq::SliceRandom;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Tunables for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Maximum number of probes in flight at any instant.
    pub concurrency: usize,
    /// Per-probe connect timeout.
    pub timeout: Duration,
    /// Maximum probe dispatches per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Dispatch ports in random order instead of ascending.
    pub randomize: bool,
}

impl ScanOptions {
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self {
            concurrency,
            timeout,
            rate_limit: 0,
            randomize: false,
        }
    }

    pub fn with_rate_limit(mut self, rate: u32) -> Self {
        self.rate_limit = rate;
        self
    }

    pub fn with_randomized_order(mut self) -> Self {
        self.randomize = true;
        self
    }

    /// Reject options no scan could run with.
    pub fn validate(&self) -> ScanResult<()> {
        if self.concurrency == 0 {
            return Err(ScanError::InvalidArgument(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(ScanError::InvalidArgument(format!(
                "concurrency limit {} is too large",
                self.concurrency
            )));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidArgument(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Drives one prober over a set of ports with bounded concurrency.
///
/// # Example
///
/// ```rust,ignore
/// use portprobe::scanner::{Coordinator, ScanOptions, TcpConnectProber};
/// use portprobe::types::{PortSpec, ScanTarget};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// let coordinator = Coordinator::new(
///     TcpConnectProber::new(),
///     ScanOptions::new(100, Duration::from_millis(500)),
/// )?;
/// let ports = "20-25,80,443".parse::<PortSpec>()?.to_ports();
/// let target = ScanTarget::from("127.0.0.1".parse::<std::net::IpAddr>()?);
/// let report = coordinator.run(&target, &ports, CancellationToken::new()).await?;
/// ```
pub struct Coordinator<P> {
    prober: Arc<P>,
    options: ScanOptions,
    limiter: Option<RateLimiter>,
    progress: Option<ProgressBar>,
}

impl<P: Prober + 'static> Coordinator<P> {
    /// Create a coordinator. Fails with `InvalidArgument` for unusable
    /// options.
    pub fn new(prober: P, options: ScanOptions) -> ScanResult<Self> {
        options.validate()?;
        Ok(Self {
            prober: Arc::new(prober),
            limiter: RateLimiter::new(options.rate_limit),
            options,
            progress: None,
        })
    }

    /// Tick `progress` once per finished probe.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Probe every port in `ports` on `target`.
    ///
    /// Duplicate ports are probed once. Returns `Cancelled` with a partial
    /// report if `cancel` fires before every port has been classified.
    pub async fn run(
        &self,
        target: &ScanTarget,
        ports: &[Port],
        cancel: CancellationToken,
    ) -> ScanResult<ScanReport> {
        if ports.is_empty() {
            return Err(ScanError::InvalidArgument("no ports to scan".to_string()));
        }

        let id = ScanId::new();
        let span = info_span!("scan", id = %id.short(), target = %target);
        self.execute(id, target, ports, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        id: ScanId,
        target: &ScanTarget,
        ports: &[Port],
        cancel: CancellationToken,
    ) -> ScanResult<ScanReport> {
        let mut builder = ReportBuilder::new(id, target.clone(), self.prober.name(), ports);

        let mut queue = ports.to_vec();
        queue.sort_unstable();
        queue.dedup();
        if self.options.randomize {
            queue.shuffle(&mut rand::thread_rng());
        }

        info!(
            ports = builder.requested(),
            concurrency = self.options.concurrency,
            timeout_ms = self.options.timeout.as_millis() as u64,
            prober = self.prober.name(),
            "starting scan"
        );
        if let Some(pb) = &self.progress {
            pb.set_length(queue.len() as u64);
        }

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut tasks: JoinSet<ProbeResult> = JoinSet::new();
        let mut pending = queue.into_iter().peekable();

        'dispatch: while let Some(&port) = pending.peek() {
            if let Some(limiter) = &self.limiter {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'dispatch,
                    _ = limiter.wait() => {}
                }
            }

            // Keep draining finished probes while waiting for a free slot so
            // results land in the builder as soon as they exist.
            let permit = loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'dispatch,
                    Some(joined) = tasks.join_next() => self.collect(&mut builder, joined),
                    acquired = Arc::clone(&semaphore).acquire_owned() => match acquired {
                        Ok(permit) => break permit,
                        Err(_) => break 'dispatch,
                    },
                }
            };

            pending.next();
            let prober = Arc::clone(&self.prober);
            let cancel = cancel.clone();
            let addr = SocketAddr::new(target.ip, port.as_u16());
            let connect_timeout = self.options.timeout;
            tasks.spawn(async move {
                let _permit = permit;
                run_probe(prober.as_ref(), port, addr, connect_timeout, &cancel).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            self.collect(&mut builder, joined);
        }

        if cancel.is_cancelled() && !builder.is_complete() {
            let partial = builder.into_partial();
            info!(
                completed = partial.completed_count(),
                requested = partial.requested,
                "scan cancelled"
            );
            if let Some(pb) = &self.progress {
                pb.abandon_with_message("cancelled");
            }
            return Err(ScanError::Cancelled(Box::new(partial)));
        }

        let report = builder.finish();
        let summary = report.summary();
        info!(
            open = summary.open,
            closed = summary.closed,
            filtered = summary.filtered,
            errors = summary.error,
            duration_ms = report.info().duration.as_millis() as u64,
            "scan complete"
        );
        if let Some(pb) = &self.progress {
            pb.finish_with_message("scan complete");
        }
        Ok(report)
    }

    fn collect(&self, builder: &mut ReportBuilder, joined: Result<ProbeResult, JoinError>) {
        match joined {
            Ok(result) => {
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                    if result.is_open() {
                        pb.set_message(format!("found open port {}", result.port));
                    }
                }
                builder.record(result);
            }
            Err(e) => warn!(error = %e, "probe task failed"),
        }
    }
}

/// One probe's lifecycle: in flight until it classifies, overruns its time
/// budget (filtered) or sees cancellation.
async fn run_probe<P: Prober + ?Sized>(
    prober: &P,
    port: Port,
    addr: SocketAddr,
    connect_timeout: Duration,
    cancel: &CancellationToken,
) -> ProbeResult {
    let start = Instant::now();
    let budget = prober.time_budget(connect_timeout);

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return ProbeResult::new(port, ProbeState::Cancelled, start.elapsed());
        }
        finished = timeout(budget, prober.probe(addr, connect_timeout)) => {
            finished.unwrap_or_else(|_| ProbeOutcome::filtered())
        }
    };

    let result = ProbeResult::from_outcome(port, outcome, start.elapsed());
    debug!(
        %port,
        state = %result.state,
        elapsed_ms = result.elapsed_ms(),
        "probe finished"
    );
    result
}

/// Scan `target` for the ports in `ports` with a plain TCP connect prober.
///
/// Both specifications are parsed and the options validated before any
/// network activity, so malformed input fails with `InvalidArgument` without
/// touching the network. The host is resolved once and shared by all probes.
pub async fn scan(
    target: &str,
    ports: &str,
    options: ScanOptions,
    cancel: CancellationToken,
) -> ScanResult<ScanReport> {
    let ports = ports.parse::<PortSpec>()?.to_ports();
    let spec = TargetSpec::parse(target)?;
    let coordinator = Coordinator::new(TcpConnectProber::new(), options)?;

    let target = spec.resolve().await?;
    coordinator.run(&target, &ports, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::Rng;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Classifies by port number after a random delay, tracking how many
    /// probes run at once.
    #[derive(Default)]
    struct SyntheticProber {
        max_delay_ms: u64,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SyntheticProber {
        fn with_delay(max_delay_ms: u64) -> Self {
            Self {
                max_delay_ms,
                ..Self::default()
            }
        }
    }

    fn expected_state(port: u16) -> ProbeState {
        match port % 3 {
            0 => ProbeState::Open,
            1 => ProbeState::Closed,
            _ => ProbeState::Error("synthetic failure".to_string()),
        }
    }

    #[async_trait]
    impl Prober for SyntheticProber {
        fn name(&self) -> &'static str {
            "synthetic"
        }

        async fn probe(&self, addr: SocketAddr, _timeout: Duration) -> ProbeOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = rand::thread_rng().gen_range(0..=self.max_delay_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ProbeOutcome::new(expected_state(addr.port()))
        }
    }

    /// Never answers ports at or above `hang_from`.
    struct SilentAbove {
        hang_from: u16,
    }

    #[async_trait]
    impl Prober for SilentAbove {
        fn name(&self) -> &'static str {
            "silent"
        }

        async fn probe(&self, addr: SocketAddr, _timeout: Duration) -> ProbeOutcome {
            if addr.port() >= self.hang_from {
                std::future::pending::<()>().await;
            }
            ProbeOutcome::new(expected_state(addr.port()))
        }
    }

    struct PanicsOn(u16);

    #[async_trait]
    impl Prober for PanicsOn {
        fn name(&self) -> &'static str {
            "panicky"
        }

        async fn probe(&self, addr: SocketAddr, _timeout: Duration) -> ProbeOutcome {
            if addr.port() == self.0 {
                panic!("prober bug");
            }
            ProbeOutcome::closed()
        }
    }

    fn localhost() -> ScanTarget {
        ScanTarget::from(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    fn ports(range: std::ops::RangeInclusive<u16>) -> Vec<Port> {
        range.filter_map(Port::new).collect()
    }

    #[test]
    fn test_options_validation() {
        assert!(ScanOptions::new(1, Duration::from_millis(1)).validate().is_ok());
        assert!(matches!(
            ScanOptions::new(0, Duration::from_secs(1)).validate(),
            Err(ScanError::InvalidArgument(_))
        ));
        assert!(matches!(
            ScanOptions::new(10, Duration::ZERO).validate(),
            Err(ScanError::InvalidArgument(_))
        ));
        assert!(Coordinator::new(
            SyntheticProber::default(),
            ScanOptions::new(0, Duration::from_secs(1))
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_empty_port_set_rejected() {
        let coordinator = Coordinator::new(
            SyntheticProber::default(),
            ScanOptions::new(4, Duration::from_secs(1)),
        )
        .unwrap();
        let err = coordinator
            .run(&localhost(), &[], CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_one_sorted_result_per_port() {
        let requested = ports(1000..=1099);
        for concurrency in [1, 3, 16, 500] {
            let coordinator = Coordinator::new(
                SyntheticProber::with_delay(5),
                ScanOptions::new(concurrency, Duration::from_secs(5)).with_randomized_order(),
            )
            .unwrap();

            let report = coordinator
                .run(&localhost(), &requested, CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(report.len(), requested.len(), "concurrency {concurrency}");
            let got: Vec<Port> = report.results().iter().map(|r| r.port).collect();
            assert_eq!(got, requested, "concurrency {concurrency}");
            for result in report.results() {
                assert_eq!(result.state, expected_state(result.port.as_u16()));
            }
        }
    }

    #[tokio::test]
    async fn test_duplicate_ports_probed_once() {
        let requested: Vec<Port> = [80, 22, 80, 22, 443].into_iter().filter_map(Port::new).collect();
        let coordinator = Coordinator::new(
            SyntheticProber::default(),
            ScanOptions::new(8, Duration::from_secs(1)),
        )
        .unwrap();
        let report = coordinator
            .run(&localhost(), &requested, CancellationToken::new())
            .await
            .unwrap();
        let got: Vec<u16> = report.results().iter().map(|r| r.port.as_u16()).collect();
        assert_eq!(got, vec![22, 80, 443]);
    }

    #[tokio::test]
    async fn test_concurrency_limit_respected() {
        let prober = Arc::new(SyntheticProber::with_delay(10));
        let coordinator = Coordinator::new(
            Arc::clone(&prober),
            ScanOptions::new(7, Duration::from_secs(5)),
        )
        .unwrap();

        coordinator
            .run(&localhost(), &ports(1..=200), CancellationToken::new())
            .await
            .unwrap();

        let peak = prober.peak.load(Ordering::SeqCst);
        assert!(peak <= 7, "peak in-flight {peak} exceeded limit");
        assert!(peak >= 2, "probes never overlapped");
    }

    #[tokio::test]
    async fn test_silent_host_is_filtered_after_timeout() {
        let timeout = Duration::from_millis(150);
        let coordinator =
            Coordinator::new(SilentAbove { hang_from: 1 }, ScanOptions::new(4, timeout)).unwrap();

        let report = coordinator
            .run(&localhost(), &ports(8000..=8003), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.summary().filtered, 4);
        for result in report.results() {
            assert_eq!(result.state, ProbeState::Filtered);
            assert!(result.elapsed >= timeout, "elapsed {:?}", result.elapsed);
        }
    }

    #[tokio::test]
    async fn test_cancel_returns_consistent_partial_report() {
        let requested = ports(1..=100);
        let coordinator = Coordinator::new(
            SilentAbove { hang_from: 41 },
            ScanOptions::new(10, Duration::from_secs(60)),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = coordinator
            .run(&localhost(), &requested, cancel)
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));

        let partial = err.partial_report().expect("partial report");
        assert_eq!(partial.requested, 100);
        assert_eq!(partial.completed_count(), 40);
        for result in &partial.completed {
            assert!(result.port.as_u16() <= 40);
            assert_eq!(result.state, expected_state(result.port.as_u16()));
        }
        assert_eq!(partial.interrupted.len(), 10);
        assert!(partial
            .interrupted
            .iter()
            .all(|r| r.state == ProbeState::Cancelled));
        assert_eq!(
            partial.completed.len() + partial.interrupted.len() + partial.not_started.len(),
            100
        );
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let coordinator = Coordinator::new(
            SyntheticProber::default(),
            ScanOptions::new(4, Duration::from_secs(1)),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = coordinator
            .run(&localhost(), &ports(1..=5), cancel)
            .await
            .unwrap_err();
        let partial = err.partial_report().unwrap();
        assert_eq!(partial.completed_count(), 0);
        assert_eq!(partial.not_started.len(), 5);
    }

    #[tokio::test]
    async fn test_panicking_probe_still_reported() {
        let coordinator =
            Coordinator::new(PanicsOn(3), ScanOptions::new(2, Duration::from_secs(1))).unwrap();

        let report = coordinator
            .run(&localhost(), &ports(1..=5), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.len(), 5);
        assert!(matches!(
            report.get(Port::new(3).unwrap()).unwrap().state,
            ProbeState::Error(_)
        ));
        assert_eq!(report.summary().closed, 4);
    }

    #[tokio::test]
    async fn test_rate_limit_paces_dispatch() {
        let coordinator = Coordinator::new(
            SyntheticProber::default(),
            ScanOptions::new(50, Duration::from_secs(1)).with_rate_limit(50),
        )
        .unwrap();

        let start = Instant::now();
        coordinator
            .run(&localhost(), &ports(1..=6), CancellationToken::new())
            .await
            .unwrap();
        // Five gaps of 20ms after the first immediate dispatch.
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_scan_rejects_bad_specs_before_network() {
        let options = ScanOptions::new(10, Duration::from_millis(100));
        for bad_ports in ["99999", "abc", "", "0", "10-5"] {
            let err = scan("127.0.0.1", bad_ports, options.clone(), CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, ScanError::InvalidArgument(_)), "{bad_ports:?}");
        }

        // An unresolvable name with a bad port list still fails on the ports.
        let err = scan("nonexistent.invalid", "abc", options.clone(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidArgument(_)));

        let err = scan("not a host", "80", options, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidArgument(_)));
    }
}
