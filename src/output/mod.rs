//! Output formatting module.
//!
//! Renders full and partial scan reports as plain text, JSON, JSON lines or
//! CSV. Every renderer writes into any `io::Write`, so the binary targets
//! stdout while tests capture into a buffer.

mod csv_format;
mod json_format;
mod plain;

pub use plain::{print_error, print_info, print_scan_header, print_warning};

use crate::cli::OutputFormat;
use crate::error::CliResult;
use crate::scanner::{PartialReport, ProbeResult, ScanReport};
use std::io::Write;

/// Which results to render. Counts in summaries always cover every port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    OpenOnly,
}

impl Filter {
    fn keep(self, result: &ProbeResult) -> bool {
        match self {
            Self::All => true,
            Self::OpenOnly => result.is_open(),
        }
    }

    fn apply<'a>(self, results: &'a [ProbeResult]) -> impl Iterator<Item = &'a ProbeResult> {
        results.iter().filter(move |r| self.keep(r))
    }
}

/// Render a completed scan.
pub fn write_report<W: Write>(
    out: &mut W,
    report: &ScanReport,
    format: OutputFormat,
    filter: Filter,
) -> CliResult<()> {
    match format {
        OutputFormat::Plain => plain::write_report(out, report, filter),
        OutputFormat::Json => json_format::write_report(out, report, filter),
        OutputFormat::Jsonl => json_format::write_lines(out, filter.apply(report.results())),
        OutputFormat::Csv => csv_format::write_rows(out, filter.apply(report.results())),
    }
}

/// Render what a cancelled scan had collected. In-flight probes appear with
/// state `cancelled`.
pub fn write_partial<W: Write>(
    out: &mut W,
    partial: &PartialReport,
    format: OutputFormat,
    filter: Filter,
) -> CliResult<()> {
    let mut rows: Vec<&ProbeResult> = filter
        .apply(&partial.completed)
        .chain(filter.apply(&partial.interrupted))
        .collect();
    rows.sort_by_key(|r| r.port);

    match format {
        OutputFormat::Plain => plain::write_partial(out, partial, &rows),
        OutputFormat::Json => json_format::write_partial(out, partial, &rows),
        OutputFormat::Jsonl => json_format::write_lines(out, rows.into_iter()),
        OutputFormat::Csv => csv_format::write_rows(out, rows.into_iter()),
    }
}
