// Tally Kernel
//
// Calculation history with snapshot-based undo/redo and isolated
// observer notification.

pub mod config;
pub mod engine;
pub mod history;
pub mod numeric;
pub mod observer;
pub mod operations;
pub mod persistence;
pub mod shared;

pub use config::CalculatorConfig;
pub use engine::{CalcError, Calculator};
pub use history::Record;
pub use shared::SharedCalculator;
