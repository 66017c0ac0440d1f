use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{CalculationObserver, ObserverError};
use crate::history::{HistoryLog, Record};
use crate::persistence::{CsvHistoryStore, HistoryStore};

/// Rewrites the full history table after every calculation.
pub struct AutoSaveObserver {
    path: PathBuf,
    store: Arc<dyn HistoryStore>,
}

impl AutoSaveObserver {
    /// Save as CSV, formatting values with `precision` digits.
    pub fn new(path: impl Into<PathBuf>, precision: u32) -> Self {
        Self::with_store(path, Arc::new(CsvHistoryStore::new(precision)))
    }

    pub fn with_store(path: impl Into<PathBuf>, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            path: path.into(),
            store,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalculationObserver for AutoSaveObserver {
    fn name(&self) -> &str {
        "auto-save"
    }

    fn on_calculation(&self, history: &HistoryLog, _record: &Record) -> Result<(), ObserverError> {
        self.store.write_table(&history.to_vec(), &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn saves_whole_history() {
        let dir = tempfile::tempdir().unwrap();
        let observer = AutoSaveObserver::new(dir.path().join("history.csv"), 4);
        let mut log = HistoryLog::new(10);

        log.append(Record::new("add", Decimal::ONE, Decimal::ONE, Decimal::TWO));
        let record = Record::new("multiply", Decimal::TWO, Decimal::TWO, Decimal::from(4));
        log.append(record.clone());
        observer.on_calculation(&log, &record).unwrap();

        let saved = CsvHistoryStore::new(4).read_table(observer.path()).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].operation, "multiply");
    }

    #[test]
    fn missing_directory_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let observer = AutoSaveObserver::new(dir.path().join("absent").join("history.csv"), 4);
        let record = Record::new("add", Decimal::ONE, Decimal::ONE, Decimal::TWO);

        let err = observer
            .on_calculation(&HistoryLog::new(1), &record)
            .unwrap_err();
        assert!(err.is_persistence());
    }
}
