pub mod checks;
pub mod repair;

pub use checks::{ConsistencyChecker, ConsistencyReport, DuplicateRow, MisownedRow};
pub use repair::{RepairReport, Repairer};
