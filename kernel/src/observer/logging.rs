use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;

use super::{CalculationObserver, ObserverError};
use crate::history::{HistoryLog, Record};

/// Appends one human-readable line per calculation to a log file.
///
/// The file is opened lazily on each notification, so a missing or
/// unwritable path only surfaces as a dispatch failure.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    path: PathBuf,
}

impl LoggingObserver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `2024-03-01T12:30:00Z - add(2, 3) = 5.0000`
    pub fn format_line(record: &Record) -> String {
        format!(
            "{} - {}({}, {}) = {}",
            record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            record.operation,
            record.a,
            record.b,
            record.result
        )
    }
}

impl CalculationObserver for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_calculation(&self, _history: &HistoryLog, record: &Record) -> Result<(), ObserverError> {
        tracing::info!(
            target: "tally::calculation",
            operation = %record.operation,
            a = %record.a,
            b = %record.b,
            result = %record.result,
            "calculation recorded"
        );

        let sink_err = |source| ObserverError::Sink {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(sink_err)?;
        writeln!(file, "{}", Self::format_line(record)).map_err(sink_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn appends_one_line_per_calculation() {
        let dir = tempfile::tempdir().unwrap();
        let observer = LoggingObserver::new(dir.path().join("calculator.log"));
        let mut log = HistoryLog::new(10);

        for n in 1..=2 {
            let record = Record::new("add", Decimal::from(n), Decimal::ONE, Decimal::from(n + 1));
            log.append(record.clone());
            observer.on_calculation(&log, &record).unwrap();
        }

        let text = std::fs::read_to_string(observer.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - add(1, 1) = 2"));
        assert!(lines[1].ends_with(" - add(2, 1) = 3"));
    }

    #[test]
    fn unwritable_destination_is_a_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened for appending
        let observer = LoggingObserver::new(dir.path());
        let record = Record::new("add", Decimal::ONE, Decimal::ONE, Decimal::TWO);

        let err = observer
            .on_calculation(&HistoryLog::new(1), &record)
            .unwrap_err();
        assert!(matches!(err, ObserverError::Sink { .. }));
        assert!(!err.is_persistence());
    }
}
