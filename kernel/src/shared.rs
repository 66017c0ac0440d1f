// Shared Calculator
//
// Thread-safe handle around a `Calculator`. Every compound operation
// runs under a single lock acquisition, so readers never observe a
// half-applied compute, undo, redo or clear.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;

use crate::engine::{CalcError, Calculator};
use crate::history::Record;
use crate::observer::ObserverFailure;

#[derive(Clone)]
pub struct SharedCalculator {
    inner: Arc<Mutex<Calculator>>,
}

impl SharedCalculator {
    pub fn new(calculator: Calculator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(calculator)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Calculator> {
        // engine state is only mutated after validation succeeds, so a
        // panic in another holder cannot leave it half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn compute(&self, op_name: &str, a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
        self.lock().compute(op_name, a, b)
    }

    pub fn history(&self) -> Vec<Record> {
        self.lock().history()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }

    pub fn undo(&self) -> bool {
        self.lock().undo()
    }

    pub fn redo(&self) -> bool {
        self.lock().redo()
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, CalcError> {
        self.lock().save(path)
    }

    pub fn load(&self, path: Option<&Path>) -> Result<usize, CalcError> {
        self.lock().load(path)
    }

    pub fn take_persistence_failures(&self) -> Vec<ObserverFailure> {
        self.lock().take_persistence_failures()
    }

    /// Run `f` with exclusive access to the calculator.
    pub fn with<R>(&self, f: impl FnOnce(&mut Calculator) -> R) -> R {
        f(&mut self.lock())
    }
}
