//! JSON and JSON-lines output.

use super::Filter;
use crate::error::CliResult;
use crate::scanner::{PartialReport, ProbeResult, ScanInfo, ScanReport, Summary};
use crate::types::Port;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct JsonReport<'a> {
    status: &'static str,
    #[serde(flatten)]
    info: &'a ScanInfo,
    summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    not_started: Option<&'a [Port]>,
    results: Vec<&'a ProbeResult>,
}

/// Pretty-printed document for a completed scan.
pub fn write_report<W: Write>(out: &mut W, report: &ScanReport, filter: Filter) -> CliResult<()> {
    let doc = JsonReport {
        status: "complete",
        info: report.info(),
        summary: report.summary(),
        requested: None,
        not_started: None,
        results: filter.apply(report.results()).collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    Ok(())
}

/// Pretty-printed document for a cancelled scan.
pub fn write_partial<W: Write>(
    out: &mut W,
    partial: &PartialReport,
    rows: &[&ProbeResult],
) -> CliResult<()> {
    let doc = JsonReport {
        status: "cancelled",
        info: &partial.info,
        summary: partial.summary,
        requested: Some(partial.requested),
        not_started: Some(&partial.not_started),
        results: rows.to_vec(),
    };
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    Ok(())
}

/// One compact JSON object per line, one line per port.
pub fn write_lines<'a, W: Write>(
    out: &mut W,
    results: impl Iterator<Item = &'a ProbeResult>,
) -> CliResult<()> {
    for result in results {
        serde_json::to_writer(&mut *out, result)?;
        writeln!(out)?;
    }
    Ok(())
}
