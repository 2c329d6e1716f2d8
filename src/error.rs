//! Error types for muster.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//!
//! Execution failures are deliberately absent from this taxonomy at the loop
//! level: an executor that fails or times out produces a `Failed` task, not an
//! error, so one bad task never crashes the coordination loop. Persistence
//! failures do propagate, since a phase must not claim completion if its
//! snapshot write failed.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for muster operations.
///
/// Each variant maps to a specific exit code.
#[derive(Error, Debug)]
pub enum MusterError {
    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// A task id does not exist in the pending set (phase driven out of
    /// order, or against a stale/completed id).
    #[error("task '{0}' not found in pending tasks")]
    TaskNotFound(String),

    /// A snapshot or event log read/write failed.
    #[error("persistence failed: {0}")]
    StoreError(String),

    /// The executor command could not be prepared (bad template, unparsable
    /// command line). Distinct from a failed execution, which is a valid
    /// task outcome.
    #[error("executor setup failed: {0}")]
    ExecutorError(String),
}

impl MusterError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            MusterError::UserError(_) => exit_codes::USER_ERROR,
            MusterError::TaskNotFound(_) => exit_codes::TASK_NOT_FOUND,
            MusterError::StoreError(_) => exit_codes::STORE_FAILURE,
            MusterError::ExecutorError(_) => exit_codes::EXECUTOR_FAILURE,
        }
    }
}

/// Result type alias for muster operations.
pub type Result<T> = std::result::Result<T, MusterError>;
