//! Plain text output formatting.
//!
//! One line per port, ascending. The port is right-aligned to five columns
//! and the elapsed time carries an `ms` unit:
//!
//! ```text
//!    22/tcp  open       [3ms]     ssh         SSH-2.0-OpenSSH_9.6
//!    23/tcp  closed     [0ms]     telnet
//! ```

use super::Filter;
use crate::error::CliResult;
use crate::scanner::{PartialReport, ProbeResult, ProbeState, ScanInfo, ScanReport, Summary};
use console::{style, Style};
use std::io::Write;

const RULE: &str = "───────────────────────────────────────────────────────────────";

/// Longest banner shown on a result line.
const BANNER_WIDTH: usize = 40;

pub fn write_report<W: Write>(out: &mut W, report: &ScanReport, filter: Filter) -> CliResult<()> {
    write_info(out, report.info())?;
    write_summary(out, report.len(), report.summary())?;

    let mut shown = 0;
    for result in filter.apply(report.results()) {
        write_line(out, result)?;
        shown += 1;
    }
    if shown == 0 {
        writeln!(out, "  {}", style("No ports to display.").dim())?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn write_partial<W: Write>(
    out: &mut W,
    partial: &PartialReport,
    rows: &[&ProbeResult],
) -> CliResult<()> {
    write_info(out, &partial.info)?;
    writeln!(
        out,
        "  {} scan cancelled: {} of {} ports completed, {} interrupted, {} not started",
        style("Partial:").yellow().bold(),
        partial.completed_count(),
        partial.requested,
        partial.interrupted.len(),
        partial.not_started.len()
    )?;
    write_summary(out, partial.completed_count(), partial.summary)?;

    for result in rows {
        write_line(out, result)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_info<W: Write>(out: &mut W, info: &ScanInfo) -> CliResult<()> {
    writeln!(out)?;
    writeln!(out, "  {} {}", style("Target:").bold(), info.target)?;
    writeln!(out, "  {} {}", style("Scan Type:").bold(), info.scan_type)?;
    writeln!(
        out,
        "  {} {}",
        style("Scan ID:").bold(),
        style(info.id.short()).dim()
    )?;
    writeln!(
        out,
        "  {} {:.2}s",
        style("Duration:").bold(),
        info.duration.as_secs_f64()
    )?;
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, probed: usize, summary: Summary) -> CliResult<()> {
    writeln!(
        out,
        "  {} {} ports: {} open, {} closed, {} filtered, {} error",
        style("Statistics:").bold(),
        probed,
        style(summary.open).green().bold(),
        style(summary.closed).red(),
        style(summary.filtered).yellow(),
        style(summary.error).magenta()
    )?;
    writeln!(out, "  {}", style(RULE).dim())?;
    Ok(())
}

/// `<port>/tcp  <state>  [<elapsed_ms>ms]  <service>  <banner>`
fn write_line<W: Write>(out: &mut W, result: &ProbeResult) -> CliResult<()> {
    let state_style = match result.state {
        ProbeState::Open => Style::new().green().bold(),
        ProbeState::Closed => Style::new().red(),
        ProbeState::Filtered => Style::new().yellow(),
        ProbeState::Error(_) => Style::new().magenta(),
        ProbeState::Cancelled => Style::new().dim(),
    };
    let elapsed = format!("[{}ms]", result.elapsed_ms());
    let detail = match (&result.state, &result.banner) {
        (ProbeState::Error(reason), _) => reason.clone(),
        (_, Some(banner)) => truncate_string(banner, BANNER_WIDTH),
        _ => String::new(),
    };

    let line = format!(
        "{:>5}/tcp  {}  {:<9} {:<14} {}",
        result.port,
        state_style.apply_to(format!("{:<9}", result.state)),
        elapsed,
        result.service.unwrap_or(""),
        style(detail).dim()
    );
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}

/// Truncate to `max_len` characters, ending with an ellipsis when cut.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(target: &str, scan_type: &str, ports: usize) {
    eprintln!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portprobe").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{} Scan type: {}", style("•").dim(), style(scan_type).yellow());
    eprintln!("{} Target: {}", style("•").dim(), style(target).white().bold());
    eprintln!(
        "{} Scanning {} ports...",
        style("•").dim(),
        style(ports).white().bold()
    );
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), msg);
}
