// History Persistence
//
// Row-oriented CSV encoding of the history log:
//
//   operation,a,b,result,timestamp
//
// Numbers use the display rule from `numeric::display_value`; timestamps
// are RFC 3339 in UTC.

mod store;

pub use store::HistoryStore;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::history::Record;
use crate::numeric::display_value;

pub const HEADER: [&str; 5] = ["operation", "a", "b", "result", "timestamp"];

/// Read or write failure on a history table.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed row {row} in {}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        row: usize,
        reason: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryRow {
    operation: String,
    a: String,
    b: String,
    result: String,
    timestamp: String,
}

/// CSV-backed [`HistoryStore`].
#[derive(Debug, Clone, Copy)]
pub struct CsvHistoryStore {
    precision: u32,
}

impl CsvHistoryStore {
    /// `precision` controls how non-integer values are written.
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    fn to_row(&self, record: &Record) -> HistoryRow {
        HistoryRow {
            operation: record.operation.clone(),
            a: display_value(record.a, self.precision),
            b: display_value(record.b, self.precision),
            result: display_value(record.result, self.precision),
            timestamp: record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

impl HistoryStore for CsvHistoryStore {
    fn write_table(&self, records: &[Record], path: &Path) -> Result<(), PersistenceError> {
        let csv_err = |source| PersistenceError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(csv_err)?;

        writer.write_record(HEADER).map_err(csv_err)?;
        for record in records {
            writer.serialize(self.to_row(record)).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), rows = records.len(), "history table written");
        Ok(())
    }

    fn read_table(&self, path: &Path) -> Result<Vec<Record>, PersistenceError> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(path).map_err(|source| PersistenceError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<HistoryRow>().enumerate() {
            // header is line 1
            let line = index + 2;
            let row = row.map_err(|source| PersistenceError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            records.push(parse_row(row).map_err(|reason| PersistenceError::Malformed {
                path: path.to_path_buf(),
                row: line,
                reason,
            })?);
        }

        tracing::debug!(path = %path.display(), rows = records.len(), "history table read");
        Ok(records)
    }
}

fn parse_row(row: HistoryRow) -> Result<Record, String> {
    Ok(Record {
        a: parse_decimal("a", &row.a)?,
        b: parse_decimal("b", &row.b)?,
        result: parse_decimal("result", &row.result)?,
        timestamp: parse_timestamp(&row.timestamp)?,
        operation: row.operation,
    })
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| format!("field `{field}` is not a number: {raw:?}"))
}

/// RFC 3339 first, then a naive `YYYY-MM-DD HH:MM:SS[.f]` read as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| format!("unrecognised timestamp {raw:?}"))
}
