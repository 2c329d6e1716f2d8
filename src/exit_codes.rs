//! Exit code constants for the muster CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state)
//! - 2: Unknown task id
//! - 3: Persistence failure
//! - 4: Executor setup failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid state.
pub const USER_ERROR: i32 = 1;

/// A task id was not found in the pending set.
pub const TASK_NOT_FOUND: i32 = 2;

/// Persistence failure: a snapshot or event log read/write failed.
pub const STORE_FAILURE: i32 = 3;

/// Executor setup failure: the executor command could not be prepared.
pub const EXECUTOR_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            TASK_NOT_FOUND,
            STORE_FAILURE,
            EXECUTOR_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
