//! Processing of a single trade file into one volatility result
//!
//! A trade file is comma-separated text: one header line, then records of
//! `secid,tradetime,price,quantity`. Only the price column is used.

use crate::error::UnitFailure;
use crate::metric::{calculate_volatility, MetricError, PriceSeries};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, trace};

const FIELDS_PER_RECORD: usize = 4;
const PRICE_FIELD: usize = 2;

/// Volatility of one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityResult {
    pub instrument_id: String,
    pub volatility: f64,
}

/// Which group of the report a result belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    Zero,
    NonZero(f64),
}

impl VolatilityResult {
    pub fn new(instrument_id: impl Into<String>, volatility: f64) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            volatility,
        }
    }

    pub fn classify(&self) -> Classification {
        if self.volatility == 0.0 {
            Classification::Zero
        } else {
            Classification::NonZero(self.volatility)
        }
    }
}

impl From<MetricError> for UnitFailure {
    fn from(err: MetricError) -> Self {
        match err {
            MetricError::Degenerate { min, max } => UnitFailure::Degenerate { min, max },
        }
    }
}

/// Derive the instrument identifier from a file name: everything before the first `.`
pub fn instrument_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

/// Read the price column from trade data, skipping the header line
pub fn read_prices<R: Read>(source: R) -> Result<PriceSeries, UnitFailure> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let header = reader.headers().map_err(unreadable)?;
    if header.is_empty() {
        return Err(UnitFailure::MissingHeader);
    }

    let mut series = PriceSeries::default();
    for record in reader.records() {
        let record = record.map_err(unreadable)?;
        let line = record.position().map_or(0, |pos| pos.line());

        if record.len() != FIELDS_PER_RECORD {
            return Err(UnitFailure::FieldCount {
                line,
                found: record.len(),
            });
        }

        let raw = &record[PRICE_FIELD];
        let price = raw
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite())
            .ok_or_else(|| UnitFailure::InvalidPrice {
                line,
                value: raw.to_string(),
            })?;
        series.push(price);
    }

    Ok(series)
}

fn unreadable(err: impl std::fmt::Display) -> UnitFailure {
    UnitFailure::Unreadable {
        message: err.to_string(),
    }
}

/// Read one trade file into a price series
pub fn read_price_series(path: &Path) -> Result<PriceSeries, UnitFailure> {
    let file = File::open(path).map_err(unreadable)?;
    read_prices(io::BufReader::new(file))
}

/// Run one unit of work: read the file and compute its volatility
pub fn process_file(path: &Path) -> Result<VolatilityResult, UnitFailure> {
    let instrument_id = instrument_id(path);
    let series = read_price_series(path)?;
    trace!("{}: {} prices", instrument_id, series.len());

    let volatility = calculate_volatility(&series)?;
    debug!("{} volatility {:.4}", instrument_id, volatility);

    Ok(VolatilityResult {
        instrument_id,
        volatility,
    })
}

/// The single message an isolated worker writes back to the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerMessage {
    Completed { result: VolatilityResult },
    Failed { failure: UnitFailure },
}

impl From<Result<VolatilityResult, UnitFailure>> for WorkerMessage {
    fn from(outcome: Result<VolatilityResult, UnitFailure>) -> Self {
        match outcome {
            Ok(result) => WorkerMessage::Completed { result },
            Err(failure) => WorkerMessage::Failed { failure },
        }
    }
}

impl WorkerMessage {
    pub fn into_result(self) -> Result<VolatilityResult, UnitFailure> {
        match self {
            WorkerMessage::Completed { result } => Ok(result),
            WorkerMessage::Failed { failure } => Err(failure),
        }
    }
}

/// Worker-side entry point: process `path` and write exactly one message line
pub fn serve<W: Write>(path: &Path, mut out: W) -> io::Result<()> {
    let message = WorkerMessage::from(process_file(path));
    serde_json::to_writer(&mut out, &message)?;
    out.write_all(b"\n")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const HEADER: &str = "SECID,TRADETIME,PRICE,QUANTITY\n";

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_instrument_id_strips_extension() {
        assert_eq!(instrument_id(Path::new("trades/TICKER_AFH9.csv")), "TICKER_AFH9");
        assert_eq!(instrument_id(Path::new("SBER")), "SBER");
        assert_eq!(instrument_id(Path::new("dir/PIKK.2024.csv")), "PIKK");
    }

    #[test]
    fn test_read_prices_skips_header() {
        let data = format!("{HEADER}SBER,10:00:01,100.5,10\nSBER,10:00:02,99.5,3\n");
        let series = read_prices(data.as_bytes()).unwrap();
        assert_eq!(series.as_slice(), &[100.5, 99.5]);
    }

    #[test]
    fn test_read_prices_header_only_is_empty_series() {
        let series = read_prices(HEADER.as_bytes()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_read_prices_empty_input_misses_header() {
        assert_eq!(read_prices(&b""[..]).unwrap_err(), UnitFailure::MissingHeader);
    }

    #[test]
    fn test_read_prices_rejects_wrong_field_count() {
        let data = format!("{HEADER}SBER,10:00:01,100.5,10\nSBER,10:00:02,99.5\n");
        assert_eq!(
            read_prices(data.as_bytes()).unwrap_err(),
            UnitFailure::FieldCount { line: 3, found: 3 }
        );
    }

    #[test]
    fn test_read_prices_rejects_non_numeric_price() {
        let data = format!("{HEADER}SBER,10:00:01,abc,10\n");
        assert_eq!(
            read_prices(data.as_bytes()).unwrap_err(),
            UnitFailure::InvalidPrice {
                line: 2,
                value: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_read_prices_rejects_non_finite_price() {
        let data = format!("{HEADER}SBER,10:00:01,NaN,10\n");
        assert!(matches!(
            read_prices(data.as_bytes()),
            Err(UnitFailure::InvalidPrice { line: 2, .. })
        ));
    }

    #[test]
    fn test_process_file_computes_volatility() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "AAA.csv",
            &format!("{HEADER}AAA,1,75,1\nAAA,2,125,1\nAAA,3,100,1\n"),
        );
        let result = process_file(&path).unwrap();
        assert_eq!(result.instrument_id, "AAA");
        assert!((result.volatility - 50.0).abs() < 1e-9);
        assert!(matches!(result.classify(), Classification::NonZero(_)));
    }

    #[test]
    fn test_process_file_flat_prices_classify_as_zero() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "FLAT.csv", &format!("{HEADER}F,1,10,1\nF,2,10,1\n"));
        let result = process_file(&path).unwrap();
        assert_eq!(result.classify(), Classification::Zero);
    }

    #[test]
    fn test_process_file_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = process_file(&dir.path().join("GONE.csv")).unwrap_err();
        assert!(matches!(err, UnitFailure::Unreadable { .. }));
    }

    #[test]
    fn test_process_file_degenerate_range() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "NEG.csv", &format!("{HEADER}N,1,-5,1\nN,2,5,1\n"));
        assert_eq!(
            process_file(&path).unwrap_err(),
            UnitFailure::Degenerate { min: -5.0, max: 5.0 }
        );
    }

    #[test]
    fn test_process_file_negative_prices_are_degenerate() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "SHORT.csv", &format!("{HEADER}S,1,-10,1\nS,2,-5,1\n"));
        assert_eq!(
            process_file(&path).unwrap_err(),
            UnitFailure::Degenerate { min: -10.0, max: -5.0 }
        );
    }

    #[test]
    fn test_serve_writes_one_message_line() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "BBB.csv", &format!("{HEADER}B,1,9.5,1\nB,2,10.5,1\n"));

        let mut out = Vec::new();
        serve(&path, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);

        let message: WorkerMessage = serde_json::from_str(text.trim()).unwrap();
        let result = message.into_result().unwrap();
        assert_eq!(result.instrument_id, "BBB");
        assert!((result.volatility - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_serve_reports_failure_in_message() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "BAD.csv", &format!("{HEADER}B,1,x,1\n"));

        let mut out = Vec::new();
        serve(&path, &mut out).unwrap();
        let message: WorkerMessage = serde_json::from_slice(&out).unwrap();
        assert!(matches!(
            message,
            WorkerMessage::Failed {
                failure: UnitFailure::InvalidPrice { .. }
            }
        ));
    }
}
