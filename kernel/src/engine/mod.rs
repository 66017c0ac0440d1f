// Calculator Engine
//
// Orchestrates a calculation as one step from the caller's view:
// resolve → apply → round → snapshot → append → trim → notify.
// Undo and redo never touch the operation registry; they only swap
// history snapshots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::CalculatorConfig;
use crate::history::undo::UndoRedoStack;
use crate::history::{HistoryLog, Record};
use crate::numeric::{check_magnitude, display_value, round_result};
use crate::observer::{
    AutoSaveObserver, CalculationObserver, LoggingObserver, ObserverFailure, ObserverRegistry,
};
use crate::operations::{Operation, OperationError};
use crate::persistence::{CsvHistoryStore, HistoryStore, PersistenceError};

/// Auto-save failures kept between drains; older ones are dropped first.
pub const MAX_RETAINED_FAILURES: usize = 32;

/// Errors surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// The calculator: history, undo/redo and observers.
pub struct Calculator {
    config: CalculatorConfig,
    history: HistoryLog,
    stacks: UndoRedoStack,
    observers: Arc<ObserverRegistry>,
    store: Arc<dyn HistoryStore>,
    persistence_failures: Vec<ObserverFailure>,
}

impl Calculator {
    /// A calculator with no observers, persisting as CSV.
    pub fn new(config: CalculatorConfig) -> Self {
        let store = Arc::new(CsvHistoryStore::new(config.precision));
        Self::with_store(config, store)
    }

    pub fn with_store(config: CalculatorConfig, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            history: HistoryLog::new(config.max_history_size),
            stacks: UndoRedoStack::new(),
            observers: Arc::new(ObserverRegistry::new()),
            store,
            persistence_failures: Vec::new(),
            config,
        }
    }

    /// A calculator wired with the logging observer and, when enabled,
    /// the auto-save observer.
    pub fn with_default_observers(config: CalculatorConfig) -> Self {
        let calculator = Self::new(config);
        calculator.register_observer(Arc::new(LoggingObserver::new(
            calculator.config.log_file.clone(),
        )));
        if calculator.config.auto_save {
            calculator.register_observer(Arc::new(AutoSaveObserver::with_store(
                calculator.config.history_file.clone(),
                calculator.store.clone(),
            )));
        }
        calculator
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Shared handle to the observer registry.
    pub fn observers(&self) -> Arc<ObserverRegistry> {
        self.observers.clone()
    }

    pub fn register_observer(&self, observer: Arc<dyn CalculationObserver>) -> bool {
        self.observers.register(observer)
    }

    pub fn unregister_observer(&self, observer: &Arc<dyn CalculationObserver>) -> bool {
        self.observers.unregister(observer)
    }

    /// Run a calculation and record it.
    ///
    /// Validation and arithmetic errors leave the calculator untouched.
    /// Observer failures never surface here; auto-save failures are kept
    /// for [`Calculator::take_persistence_failures`].
    pub fn compute(&mut self, op_name: &str, a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
        let operation = Operation::resolve(op_name)?;
        for operand in [a, b] {
            check_magnitude(operand, self.config.max_input_value).map_err(OperationError::from)?;
        }
        let result = round_result(operation.apply(a, b)?, self.config.precision);

        self.stacks.push_undo(self.history.capture());
        let record = Record::new(operation.name(), a, b, result);
        if let Some(evicted) = self.history.append(record.clone()) {
            tracing::debug!(operation = %evicted.operation, "evicted oldest history record");
        }
        tracing::debug!(
            operation = operation.name(),
            %a,
            %b,
            %result,
            history_len = self.history.len(),
            "calculation complete"
        );

        let report = self.observers.notify_all(&self.history, &record);
        self.persistence_failures.extend(
            report
                .failures
                .into_iter()
                .filter(|failure| failure.error.is_persistence()),
        );
        let excess = self
            .persistence_failures
            .len()
            .saturating_sub(MAX_RETAINED_FAILURES);
        if excess > 0 {
            self.persistence_failures.drain(..excess);
            tracing::debug!(dropped = excess, "discarded oldest undrained auto-save failures");
        }

        Ok(result)
    }

    /// Owned copy of the history, oldest first.
    pub fn history(&self) -> Vec<Record> {
        self.history.to_vec()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Empty the history as an undoable action.
    ///
    /// Observers are not notified, so an auto-saved file keeps the
    /// pre-clear history until the next calculation or explicit save.
    pub fn clear(&mut self) {
        if !self.history.is_empty() {
            self.stacks.push_undo(self.history.capture());
        }
        self.history.clear();
        tracing::debug!("history cleared");
    }

    /// Step back one action. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.stacks.pop_undo() else {
            return false;
        };
        self.stacks.push_redo(self.history.capture());
        self.history.restore(&previous);
        tracing::debug!(history_len = self.history.len(), "undo");
        true
    }

    /// Re-apply one undone action. Returns `false` when there is nothing
    /// to redo. Deeper redo entries stay available.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.stacks.pop_redo() else {
            return false;
        };
        self.stacks.push_undo_preserve_redo(self.history.capture());
        self.history.restore(&next);
        tracing::debug!(history_len = self.history.len(), "redo");
        true
    }

    pub fn can_undo(&self) -> bool {
        self.stacks.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.stacks.can_redo()
    }

    /// Write the history table, defaulting to the configured history file.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, CalcError> {
        let target = self.resolve_path(path);
        self.store.write_table(&self.history.to_vec(), &target)?;
        tracing::info!(path = %target.display(), rows = self.history.len(), "history saved");
        Ok(target)
    }

    /// Replace the history with a saved table.
    ///
    /// A missing file changes nothing and loads zero records. Otherwise the
    /// load is undoable like any other action. Observers are not notified.
    pub fn load(&mut self, path: Option<&Path>) -> Result<usize, CalcError> {
        let target = self.resolve_path(path);
        if !target.exists() {
            tracing::info!(path = %target.display(), "no saved history to load");
            return Ok(0);
        }

        let records = self.store.read_table(&target)?;
        self.stacks.push_undo(self.history.capture());
        self.history.replace(records);
        tracing::info!(path = %target.display(), rows = self.history.len(), "history loaded");
        Ok(self.history.len())
    }

    /// Drain auto-save failures collected since the last call, oldest
    /// first. At most [`MAX_RETAINED_FAILURES`] are kept.
    pub fn take_persistence_failures(&mut self) -> Vec<ObserverFailure> {
        std::mem::take(&mut self.persistence_failures)
    }

    /// Render a value the way history and saved files show it.
    pub fn display(&self, value: Decimal) -> String {
        display_value(value, self.config.precision)
    }

    fn resolve_path(&self, path: Option<&Path>) -> PathBuf {
        path.map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.history_file.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ObserverError;
    use crate::operations::OperandError;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn calculator() -> Calculator {
        Calculator::new(CalculatorConfig::with_base_dir("/nonexistent"))
    }

    fn results(calc: &Calculator) -> Vec<Decimal> {
        calc.history().iter().map(|r| r.result).collect()
    }

    struct AlwaysFails;

    impl CalculationObserver for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        fn on_calculation(&self, _: &HistoryLog, _: &Record) -> Result<(), ObserverError> {
            Err(ObserverError::Other("nope".into()))
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl CalculationObserver for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn on_calculation(&self, _: &HistoryLog, _: &Record) -> Result<(), ObserverError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn compute_rounds_to_precision() {
        let mut calc = calculator();
        assert_eq!(calc.compute("add", dec("2"), dec("3")).unwrap().to_string(), "5.0000");
        assert_eq!(
            calc.compute("percent", dec("25"), dec("100")).unwrap().to_string(),
            "25.0000"
        );
        assert_eq!(
            calc.compute("abs_diff", dec("3"), dec("10")).unwrap().to_string(),
            "7.0000"
        );
        assert_eq!(
            calc.compute("divide", dec("2"), dec("3")).unwrap().to_string(),
            "0.6667"
        );
    }

    #[test]
    fn negative_power_underflow_rounds_to_zero() {
        let mut calc = calculator();
        assert_eq!(
            calc.compute("power", dec("10"), dec("-29")).unwrap().to_string(),
            "0.0000"
        );
        assert_eq!(
            calc.compute("power", dec("2"), dec("-100")).unwrap().to_string(),
            "0.0000"
        );
        assert_eq!(calc.history_len(), 2);
    }

    #[test]
    fn compute_records_canonical_operation_name() {
        let mut calc = calculator();
        calc.compute("MULTIPLY", dec("2"), dec("4")).unwrap();
        assert_eq!(calc.history()[0].operation, "multiply");
    }

    #[test]
    fn failed_compute_leaves_state_untouched() {
        let mut calc = calculator();
        calc.compute("add", dec("1"), dec("1")).unwrap();

        let err = calc.compute("divide", dec("1"), dec("0")).unwrap_err();
        assert!(matches!(
            err,
            CalcError::Operation(OperationError::InvalidOperand(OperandError::DivisionByZero))
        ));
        let err = calc.compute("nope", dec("1"), dec("0")).unwrap_err();
        assert!(matches!(
            err,
            CalcError::Operation(OperationError::UnknownOperation { .. })
        ));

        assert_eq!(calc.history_len(), 1);
        assert!(calc.undo());
        assert!(!calc.undo());
    }

    #[test]
    fn operands_above_limit_are_rejected() {
        let mut config = CalculatorConfig::with_base_dir("/nonexistent");
        config.max_input_value = dec("100");
        let mut calc = Calculator::new(config);

        let err = calc.compute("add", dec("101"), dec("1")).unwrap_err();
        assert!(matches!(
            err,
            CalcError::Operation(OperationError::InvalidOperand(OperandError::OutOfRange { .. }))
        ));
        assert_eq!(calc.history_len(), 0);
    }

    #[test]
    fn history_is_capped_oldest_first() {
        let mut config = CalculatorConfig::with_base_dir("/nonexistent");
        config.max_history_size = 3;
        let mut calc = Calculator::new(config);

        for n in 1..=5 {
            calc.compute("add", Decimal::from(n), Decimal::ZERO).unwrap();
        }
        assert_eq!(results(&calc), vec![dec("3"), dec("4"), dec("5")]);
    }

    #[test]
    fn history_copy_cannot_mutate_engine() {
        let mut calc = calculator();
        calc.compute("add", dec("1"), dec("1")).unwrap();

        let mut copy = calc.history();
        copy.clear();
        assert_eq!(calc.history_len(), 1);
    }

    #[test]
    fn new_compute_after_undo_discards_redo() {
        let mut calc = calculator();
        calc.compute("add", dec("1"), dec("1")).unwrap();
        assert!(calc.undo());
        assert!(calc.can_redo());

        calc.compute("add", dec("2"), dec("2")).unwrap();
        assert!(!calc.redo());
        assert_eq!(results(&calc), vec![dec("4")]);
    }

    #[test]
    fn redo_keeps_deeper_redo_entries() {
        let mut calc = calculator();
        calc.compute("add", dec("1"), dec("0")).unwrap();
        calc.compute("add", dec("2"), dec("0")).unwrap();
        let full = calc.history();

        assert!(calc.undo());
        assert!(calc.undo());
        assert!(calc.history().is_empty());

        assert!(calc.redo());
        assert_eq!(results(&calc), vec![dec("1")]);
        assert!(calc.can_redo());
        assert!(calc.redo());
        assert_eq!(calc.history(), full);
        assert!(!calc.redo());
    }

    #[test]
    fn clear_then_undo_restores_history() {
        let mut calc = calculator();
        calc.compute("add", dec("1"), dec("1")).unwrap();
        calc.compute("add", dec("2"), dec("2")).unwrap();
        let before = calc.history();

        calc.clear();
        assert!(calc.history().is_empty());
        assert!(calc.undo());
        assert_eq!(calc.history(), before);
    }

    #[test]
    fn clear_on_empty_history_pushes_nothing() {
        let mut calc = calculator();
        calc.clear();
        assert!(!calc.can_undo());
    }

    #[test]
    fn failing_observer_does_not_affect_compute() {
        let mut calc = calculator();
        calc.register_observer(Arc::new(AlwaysFails));

        for n in 1..=3 {
            let result = calc.compute("add", Decimal::from(n), Decimal::ONE).unwrap();
            assert_eq!(result, Decimal::from(n + 1));
        }
        assert_eq!(calc.history_len(), 3);
        // ordinary observer failures are not persistence failures
        assert!(calc.take_persistence_failures().is_empty());
    }

    #[test]
    fn auto_save_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CalculatorConfig::with_base_dir(dir.path());
        config.history_file = dir.path().join("missing").join("history.csv");
        config.log_file = dir.path().join("calculator.log");
        let mut calc = Calculator::with_default_observers(config);

        calc.compute("add", dec("1"), dec("1")).unwrap();
        let failures = calc.take_persistence_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].observer, "auto-save");
        assert!(calc.take_persistence_failures().is_empty());
    }

    #[test]
    fn retained_auto_save_failures_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CalculatorConfig::with_base_dir(dir.path());
        config.history_file = dir.path().join("missing").join("history.csv");
        config.log_file = dir.path().join("calculator.log");
        let mut calc = Calculator::with_default_observers(config);

        for n in 0..(MAX_RETAINED_FAILURES + 8) {
            calc.compute("add", Decimal::from(n), Decimal::ONE).unwrap();
        }
        assert_eq!(calc.take_persistence_failures().len(), MAX_RETAINED_FAILURES);
        assert!(calc.take_persistence_failures().is_empty());
    }

    #[test]
    fn unregistered_observer_stops_receiving() {
        let mut calc = calculator();
        let counter = Arc::new(Counter::default());
        let handle: Arc<dyn CalculationObserver> = counter.clone();
        assert!(calc.register_observer(handle.clone()));

        calc.compute("add", dec("1"), dec("1")).unwrap();
        assert!(calc.unregister_observer(&handle));
        calc.compute("add", dec("2"), dec("2")).unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(calc.observers().is_empty());
        assert!(!calc.unregister_observer(&handle));
    }

    #[test]
    fn display_uses_integer_form_for_whole_values() {
        let calc = calculator();
        assert_eq!(calc.display(dec("5.0000")), "5");
        assert_eq!(calc.display(dec("0.125")), "0.1250");
    }
}
