//! Bulk price-bar import from CSV.
//!
//! Expected header: `timestamp,open,high,low,close`, timestamps in RFC 3339.
//! The whole file is parsed before the first append, so a malformed file
//! leaves the store untouched. Rows the store rejects (duplicate timestamp,
//! inverted range) are reported and skipped.

use crate::domain::error::{ErrorKind, LedgerError};
use crate::domain::ids::PairId;
use crate::domain::price::Price;
use crate::ports::price_port::PriceHistory;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvBarRow {
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
}

struct ParsedRow {
    line: u64,
    timestamp: DateTime<Utc>,
    open: Price,
    high: Price,
    low: Price,
    close: Price,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub appended: usize,
    pub rejected: Vec<RejectedRow>,
}

fn csv_error(line: u64, e: impl std::fmt::Display) -> LedgerError {
    LedgerError::invalid_field("csv", format!("line {line}: {e}"))
}

fn parse_price(line: u64, column: &str, raw: &str) -> Result<Price, LedgerError> {
    raw.parse::<Price>()
        .map_err(|e| csv_error(line, format!("{column}: {e}")))
}

fn parse_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>, LedgerError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().map_err(|e| csv_error(1, e))?.clone();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line());
            csv_error(line, e)
        })?;
        let line = record.position().map_or(0, |p| p.line());
        let row: CsvBarRow = record
            .deserialize(Some(&headers))
            .map_err(|e| csv_error(line, e))?;

        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| csv_error(line, format!("timestamp: {e}")))?
            .with_timezone(&Utc);

        rows.push(ParsedRow {
            line,
            timestamp,
            open: parse_price(line, "open", &row.open)?,
            high: parse_price(line, "high", &row.high)?,
            low: parse_price(line, "low", &row.low)?,
            close: parse_price(line, "close", &row.close)?,
        });
    }
    Ok(rows)
}

pub fn import_bars<S: PriceHistory + ?Sized, R: Read>(
    store: &S,
    pair: PairId,
    reader: R,
) -> Result<ImportReport, LedgerError> {
    let rows = parse_rows(reader)?;
    let mut report = ImportReport::default();

    for row in rows {
        match store.append_ohlc(pair, row.timestamp, row.open, row.high, row.low, row.close) {
            Ok(_) => report.appended += 1,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::DuplicateTimestamp | ErrorKind::InvalidRange
                ) =>
            {
                tracing::warn!(line = row.line, error = %e, "skipping bar");
                report.rejected.push(RejectedRow {
                    line: row.line,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(%pair, appended = report.appended, rejected = report.rejected.len(), "imported bars");
    Ok(report)
}

pub fn import_bars_from_path<S: PriceHistory + ?Sized, P: AsRef<Path>>(
    store: &S,
    pair: PairId,
    path: P,
) -> Result<ImportReport, LedgerError> {
    let file = File::open(path)?;
    import_bars(store, pair, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryStore;
    use crate::ports::registry_port::CurrencyRegistry;

    fn store_with_pair() -> (MemoryStore, PairId) {
        let store = MemoryStore::new();
        let eur = store.register_currency("EUR", "Euro").unwrap();
        let usd = store.register_currency("USD", "US Dollar").unwrap();
        let pair = store.register_pair(eur, usd, "EURUSD").unwrap();
        (store, pair)
    }

    #[test]
    fn imports_valid_rows() {
        let (store, pair) = store_with_pair();
        let csv = "timestamp,open,high,low,close
2024-01-02T00:00:00Z,1.1000,1.1050,1.0950,1.1020
2024-01-02T01:00:00Z,1.1020,1.1060,1.1000,1.1040
";
        let report = import_bars(&store, pair, csv.as_bytes()).unwrap();
        assert_eq!(report.appended, 2);
        assert!(report.rejected.is_empty());
        assert_eq!(store.data_range(pair).unwrap().unwrap().2, 2);
    }

    #[test]
    fn rejected_rows_reported_with_line() {
        let (store, pair) = store_with_pair();
        let csv = "timestamp,open,high,low,close
2024-01-02T00:00:00Z,1.1000,1.1050,1.0950,1.1020
2024-01-02T00:00:00Z,1.1000,1.1050,1.0950,1.1020
2024-01-02T02:00:00Z,1.1000,1.0990,1.0950,1.1020
";
        let report = import_bars(&store, pair, csv.as_bytes()).unwrap();
        assert_eq!(report.appended, 1);
        let lines: Vec<u64> = report.rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 4]);
    }

    #[test]
    fn malformed_file_appends_nothing() {
        let (store, pair) = store_with_pair();
        let csv = "timestamp,open,high,low,close
2024-01-02T00:00:00Z,1.1000,1.1050,1.0950,1.1020
yesterday,1.1000,1.1050,1.0950,1.1020
";
        let err = import_bars(&store, pair, csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidField { .. }));
        assert!(store.data_range(pair).unwrap().is_none());
    }

    #[test]
    fn short_row_reports_its_line() {
        let (store, pair) = store_with_pair();
        let csv = "timestamp,open,high,low,close
2024-01-02T00:00:00Z,1.1000,1.1050,1.0950,1.1020
2024-01-02T01:00:00Z,1.1000,1.1050
";
        let err = import_bars(&store, pair, csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3:"), "{err}");
        assert!(store.data_range(pair).unwrap().is_none());
    }

    #[test]
    fn unknown_pair_aborts() {
        let (store, _) = store_with_pair();
        let csv = "timestamp,open,high,low,close
2024-01-02T00:00:00Z,1.1000,1.1050,1.0950,1.1020
";
        let err = import_bars(&store, PairId::new(), csv.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
