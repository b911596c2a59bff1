//! CSV output formatting.

use crate::error::CliResult;
use crate::scanner::ProbeResult;
use std::io::Write;

/// Header row followed by one row per port.
pub fn write_rows<'a, W: Write>(
    out: &mut W,
    results: impl Iterator<Item = &'a ProbeResult>,
) -> CliResult<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["port", "state", "elapsed_ms", "reason", "service", "banner"])?;
    for result in results {
        let port = result.port.to_string();
        let state = result.state.to_string();
        let elapsed = result.elapsed_ms().to_string();
        wtr.write_record([
            port.as_str(),
            state.as_str(),
            elapsed.as_str(),
            result.state.reason().unwrap_or(""),
            result.service.unwrap_or(""),
            result.banner.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
