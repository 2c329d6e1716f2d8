//! The fixed phase pipeline applied to every task.
//!
//! Match forms a team, exchange records what each member brings, execute
//! runs the work, score feeds the outcome back into agent profiles. Phases
//! operate on a task plus the registry; orchestration and persistence live
//! in the coordinator.

pub mod exchange;
pub mod executor;
pub mod matchmaker;
pub mod scorer;

pub use exchange::{ExchangeReport, exchange};
pub use executor::{CommandExecutor, ExecutionOutcome, TaskExecutor, execute};
pub use matchmaker::match_team;
pub use scorer::{PerformanceScore, score};
