//! Scan subcommand implementation.
//!
//! Handles the `portprobe scan <target>` command for port scanning.

use crate::cli::OutputFormat;
use crate::config::{AppSettings, Profile};
use crate::error::{CliResult, ScanError};
use crate::output::{self, Filter};
use crate::scanner::{Coordinator, Prober, RetryingProber, ScanOptions, TcpConnectProber};
use crate::types::{Port, PortSpec, ScanTarget, TargetSpec};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufWriter, Write};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Ports scanned when neither `--ports` nor a profile names any.
const DEFAULT_PORTS: &str = "1-1000";

/// Scan a target for open ports.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Target to scan (IP address or hostname)
    ///
    /// Examples:
    ///   192.168.1.1        IPv4 address
    ///   ::1                IPv6 address
    ///   example.com        Hostname, resolved once before scanning
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Ports to scan (e.g., "80", "80,443", "1-1000", "20-25,80,443") [default: 1-1000]
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Maximum number of probes in flight
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Connection timeout in milliseconds
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value_t)]
    pub output: OutputFormat,

    /// Read a banner from open ports
    #[arg(short = 'b', long)]
    pub banner: bool,

    /// Only list open ports (summary counts still cover every port)
    #[arg(long)]
    pub open: bool,

    /// Rate limit in probes per second (0 = unlimited)
    #[arg(short = 'r', long = "rate")]
    pub rate_limit: Option<u32>,

    /// Extra attempts for filtered or failed probes
    #[arg(long)]
    pub retries: Option<u32>,

    /// Probe ports in random order
    #[arg(long)]
    pub randomize: bool,

    /// Use a built-in scan profile (see `portprobe profiles list`)
    #[arg(long = "profile", short = 'P')]
    pub profile: Option<String>,
}

/// Scan parameters after merging flags, profile and settings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScanPlan {
    ports: String,
    concurrency: usize,
    timeout_ms: u64,
    rate_limit: u32,
    retries: u32,
    banner_wait: Option<Duration>,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, settings: &AppSettings, verbose: bool, quiet: bool) -> CliResult<()> {
        let plan = self.plan(settings)?;
        debug!(?plan, "resolved scan parameters");

        // Everything is validated before the target is resolved.
        let ports = plan
            .ports
            .parse::<PortSpec>()
            .map_err(ScanError::from)?
            .to_ports();
        let spec = TargetSpec::parse(&self.target).map_err(ScanError::from)?;
        let mut options =
            ScanOptions::new(plan.concurrency, Duration::from_millis(plan.timeout_ms))
                .with_rate_limit(plan.rate_limit);
        if self.randomize {
            options = options.with_randomized_order();
        }
        options.validate()?;

        let target = spec.resolve().await.map_err(ScanError::from)?;

        let mut prober = TcpConnectProber::new();
        if let Some(wait) = plan.banner_wait {
            prober = prober.with_banners(wait);
        }

        if plan.retries > 0 {
            let prober = RetryingProber::new(prober, plan.retries);
            self.run(prober, options, &target, &ports, verbose, quiet).await
        } else {
            self.run(prober, options, &target, &ports, verbose, quiet).await
        }
    }

    /// Merge flags over the profile over the settings file.
    fn plan(&self, settings: &AppSettings) -> CliResult<ScanPlan> {
        let profile = self.profile.as_deref().map(Profile::find).transpose()?;

        let ports = self
            .ports
            .clone()
            .or_else(|| profile.map(|p| p.ports.to_string()))
            .unwrap_or_else(|| DEFAULT_PORTS.to_string());
        let concurrency = self
            .concurrency
            .or(profile.map(|p| p.concurrency))
            .unwrap_or(settings.concurrency);
        let timeout_ms = self
            .timeout
            .or(profile.map(|p| p.timeout_ms))
            .unwrap_or(settings.timeout_ms);
        let banner = self.banner || profile.is_some_and(|p| p.banner);

        Ok(ScanPlan {
            ports,
            concurrency,
            timeout_ms,
            rate_limit: self.rate_limit.unwrap_or(settings.rate_limit),
            retries: self.retries.unwrap_or(settings.retries),
            banner_wait: banner.then(|| Duration::from_millis(settings.banner_wait_ms)),
        })
    }

    async fn run<P: Prober + 'static>(
        &self,
        prober: P,
        options: ScanOptions,
        target: &ScanTarget,
        ports: &[Port],
        verbose: bool,
        quiet: bool,
    ) -> CliResult<()> {
        let plain = self.output == OutputFormat::Plain;

        // Print scan header (unless machine-readable output for clean parsing)
        if !quiet && plain {
            output::print_scan_header(&target.to_string(), prober.name(), ports.len());
        }

        let mut coordinator = Coordinator::new(prober, options)?;
        if verbose && plain {
            coordinator = coordinator.with_progress(progress_bar(ports.len()));
        }

        let cancel = CancellationToken::new();
        let ctrl_c = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => cancel.cancel(),
                    Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
                }
            }
        });
        let outcome = coordinator.run(target, ports, cancel).await;
        ctrl_c.abort();

        let filter = if self.open {
            Filter::OpenOnly
        } else {
            Filter::All
        };
        let mut out = BufWriter::new(io::stdout().lock());

        match outcome {
            Ok(report) => {
                output::write_report(&mut out, &report, self.output, filter)?;
                out.flush()?;
                if !quiet && plain {
                    output::print_info(&format!(
                        "{} open port(s) found in {:.2}s",
                        report.summary().open,
                        report.info().duration.as_secs_f64()
                    ));
                }
                Ok(())
            }
            Err(ScanError::Cancelled(partial)) => {
                if !quiet {
                    output::print_warning("scan interrupted, printing partial results");
                }
                output::write_partial(&mut out, &partial, self.output, filter)?;
                out.flush()?;
                Err(ScanError::Cancelled(partial).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ports ({eta}) {msg}",
    )
    .map(|s| s.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let pb = ProgressBar::new(len as u64);
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
