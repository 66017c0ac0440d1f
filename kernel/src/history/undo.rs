// Undo/Redo Stacks
//
// Two LIFO stacks of history snapshots. A new forward action clears the
// redo stack; re-applying a redo step does not.

use super::HistorySnapshot;

#[derive(Debug, Default)]
pub struct UndoRedoStack {
    undo: Vec<HistorySnapshot>,
    redo: Vec<HistorySnapshot>,
}

impl UndoRedoStack {
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Record the state before a new action. Invalidates all redo entries.
    pub fn push_undo(&mut self, snapshot: HistorySnapshot) {
        self.undo.push(snapshot);
        self.redo.clear();
    }

    /// Record the state before a redo step, keeping deeper redo entries.
    pub fn push_undo_preserve_redo(&mut self, snapshot: HistorySnapshot) {
        self.undo.push(snapshot);
    }

    pub fn push_redo(&mut self, snapshot: HistorySnapshot) {
        self.redo.push(snapshot);
    }

    pub fn pop_undo(&mut self) -> Option<HistorySnapshot> {
        self.undo.pop()
    }

    pub fn pop_redo(&mut self) -> Option<HistorySnapshot> {
        self.redo.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}
