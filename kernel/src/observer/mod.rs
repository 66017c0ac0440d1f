// Calculation Observers
//
// Listeners notified after every successful calculation. Dispatch is
// isolated: a failing or panicking observer never reaches the caller and
// never stops delivery to the observers registered after it.

pub mod autosave;
pub mod logging;

pub use autosave::AutoSaveObserver;
pub use logging::LoggingObserver;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crate::history::{HistoryLog, Record};
use crate::persistence::PersistenceError;

/// Failure reported by a single observer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error("cannot write to {}: {source}", path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("auto-save failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("observer panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

impl ObserverError {
    /// True for failures that lost persisted history.
    pub fn is_persistence(&self) -> bool {
        matches!(self, ObserverError::Persistence(_))
    }
}

/// Trait implemented by every calculation listener.
///
/// `history` already contains `record` as its newest entry.
pub trait CalculationObserver: Send + Sync {
    fn name(&self) -> &str;

    fn on_calculation(&self, history: &HistoryLog, record: &Record) -> Result<(), ObserverError>;
}

/// One observer failure captured during dispatch.
#[derive(Debug)]
pub struct ObserverFailure {
    pub observer: String,
    pub error: ObserverError,
}

/// Outcome of a single `notify_all` round.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failures: Vec<ObserverFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered, duplicate-free set of observers.
///
/// Uses interior mutability so observers holding a handle to the registry
/// may register or unregister others while a dispatch is running.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<Arc<dyn CalculationObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Returns `false` if this exact observer is already
    /// registered; its original position is kept.
    pub fn register(&self, observer: Arc<dyn CalculationObserver>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        if observers.iter().any(|existing| same_observer(existing, &observer)) {
            return false;
        }
        tracing::debug!(observer = observer.name(), "observer registered");
        observers.push(observer);
        true
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unregister(&self, observer: &Arc<dyn CalculationObserver>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|existing| !same_observer(existing, observer));
        before != observers.len()
    }

    pub fn len(&self) -> usize {
        self.observers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        self.current().iter().map(|o| o.name().to_string()).collect()
    }

    fn current(&self) -> Vec<Arc<dyn CalculationObserver>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Deliver `record` to every observer in registration order.
    ///
    /// The observer list is fixed when dispatch starts. Failures and panics
    /// are logged and collected in the report.
    pub fn notify_all(&self, history: &HistoryLog, record: &Record) -> DispatchReport {
        let mut report = DispatchReport::default();

        for observer in self.current() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                observer.on_calculation(history, record)
            }));
            let error = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(error)) => error,
                Err(payload) => ObserverError::Panicked(panic_message(payload.as_ref())),
            };

            if error.is_persistence() {
                tracing::error!(observer = observer.name(), error = %error, "observer failed");
            } else {
                tracing::warn!(observer = observer.name(), error = %error, "observer failed");
            }
            report.failures.push(ObserverFailure {
                observer: observer.name().to_string(),
                error,
            });
        }

        report
    }
}

fn same_observer(a: &Arc<dyn CalculationObserver>, b: &Arc<dyn CalculationObserver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".into()
    }
}
