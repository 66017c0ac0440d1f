// History Storage Abstraction
//
// Defines the durability contract for saved calculation history.
// Implementations may persist to CSV, databases, etc.

use std::path::Path;

use super::PersistenceError;
use crate::history::Record;

/// Storage backend for calculation history.
///
/// Properties required from implementations:
/// - Rows are written and read back in chronological order
/// - A table is always written whole, never appended to
/// - Reading a path that does not exist yields an empty history
pub trait HistoryStore: Send + Sync {
    /// Replace the table at `path` with `records`.
    fn write_table(&self, records: &[Record], path: &Path) -> Result<(), PersistenceError>;

    /// Load every record stored at `path`.
    fn read_table(&self, path: &Path) -> Result<Vec<Record>, PersistenceError>;
}
