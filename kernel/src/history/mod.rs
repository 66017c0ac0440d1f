// Calculation History
//
// Bounded, append-only log of completed calculations plus immutable
// snapshots of it used by undo/redo.

pub mod undo;

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// One completed calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub operation: String,
    pub a: Decimal,
    pub b: Decimal,
    pub result: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Record {
    pub fn new(operation: impl Into<String>, a: Decimal, b: Decimal, result: Decimal) -> Self {
        Self {
            operation: operation.into(),
            a,
            b,
            result,
            timestamp: Utc::now(),
        }
    }
}

/// Immutable capture of the history log at a point in time.
///
/// Records are shared with the live log; the sequence itself is owned
/// by the snapshot, so later log mutation never shows through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySnapshot {
    records: Arc<[Arc<Record>]>,
}

impl HistorySnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().map(|r| r.as_ref())
    }
}

/// Ordered log of records, oldest first, bounded by `max_size`.
#[derive(Debug)]
pub struct HistoryLog {
    records: VecDeque<Arc<Record>>,
    max_size: usize,
}

impl HistoryLog {
    /// Create an empty log. A `max_size` of zero is treated as one.
    pub fn new(max_size: usize) -> Self {
        Self {
            records: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    /// Append a record, evicting the oldest one if the log is full.
    ///
    /// Returns the evicted record, if any.
    pub fn append(&mut self, record: Record) -> Option<Arc<Record>> {
        self.records.push_back(Arc::new(record));
        if self.records.len() > self.max_size {
            self.records.pop_front()
        } else {
            None
        }
    }

    /// Replace the whole log, keeping only the newest `max_size` records.
    pub fn replace(&mut self, records: Vec<Record>) {
        let skip = records.len().saturating_sub(self.max_size);
        self.records = records.into_iter().skip(skip).map(Arc::new).collect();
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn capture(&self) -> HistorySnapshot {
        HistorySnapshot {
            records: self.records.iter().cloned().collect(),
        }
    }

    /// Replace the log with a fresh copy of the snapshot's sequence.
    pub fn restore(&mut self, snapshot: &HistorySnapshot) {
        self.records = snapshot.records.iter().cloned().collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().map(|r| r.as_ref())
    }

    /// Owned copy of every record, oldest first.
    pub fn to_vec(&self) -> Vec<Record> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
