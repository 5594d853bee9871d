//! Rendering of a finished scan
//!
//! The text report goes to stdout in a fixed shape; failures are rendered
//! separately so the caller can send them to stderr.

use crate::aggregate::{RankedInstrument, Ranking};
use crate::error::{UnitError, UnitErrorKind, UnitFailure};
use crate::scan::ScanSummary;
use serde::Serialize;
use std::io::{self, Write};

pub const MAX_HEADING: &str = "Максимальная волатильность:";
pub const MIN_HEADING: &str = "Минимальная волатильность:";
pub const ZERO_HEADING: &str = "Нулевая волатильность:";

const INDENT: &str = "    ";

fn write_ranked<W: Write>(out: &mut W, entries: &[RankedInstrument]) -> io::Result<()> {
    for entry in entries {
        writeln!(
            out,
            "{INDENT}{} - {:.2} %",
            entry.instrument_id, entry.volatility
        )?;
    }
    Ok(())
}

/// Write the three-section ranking report
pub fn write_text<W: Write>(out: &mut W, ranking: &Ranking) -> io::Result<()> {
    writeln!(out, "{MAX_HEADING}")?;
    write_ranked(out, &ranking.max)?;
    writeln!(out, "{MIN_HEADING}")?;
    write_ranked(out, &ranking.min)?;
    writeln!(out, "{ZERO_HEADING}")?;
    for id in &ranking.zero {
        writeln!(out, "{INDENT}{id}")?;
    }
    Ok(())
}

/// Write the failure block; nothing is written when there are no failures
pub fn write_failures<W: Write>(out: &mut W, failures: &[UnitError]) -> io::Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    writeln!(out, "Failed to process {} file(s):", failures.len())?;
    for failure in failures {
        writeln!(
            out,
            "{INDENT}{} - {}: {}",
            failure.path.display(),
            failure.kind(),
            failure.failure
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct FailureView<'a> {
    path: String,
    kind: UnitErrorKind,
    reason: String,
    detail: &'a UnitFailure,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    files: usize,
    max: &'a [RankedInstrument],
    min: &'a [RankedInstrument],
    zero: &'a [String],
    failures: Vec<FailureView<'a>>,
    duplicates: &'a [String],
}

/// Write the whole summary as one JSON document
pub fn write_json<W: Write>(out: &mut W, summary: &ScanSummary) -> io::Result<()> {
    let report = JsonReport {
        files: summary.files,
        max: &summary.ranking.max,
        min: &summary.ranking.min,
        zero: &summary.ranking.zero,
        failures: summary
            .failures
            .iter()
            .map(|f| FailureView {
                path: f.path.display().to_string(),
                kind: f.kind(),
                reason: f.failure.to_string(),
                detail: &f.failure,
            })
            .collect(),
        duplicates: summary.duplicates(),
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)
}
