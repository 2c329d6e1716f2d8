//! Task model for muster.
//!
//! A task moves through a fixed phase pipeline:
//!
//! ```text
//! Pending -> Matching -> Exchanging -> Executing -> Scoring -> {Completed, Failed}
//! ```
//!
//! Transitions are strictly forward and enforced by [`Task::advance`]. There
//! are no retries within a task instance: a failed task is terminal, and
//! re-submission creates a new task with a new id. Each phase appends a
//! [`PhaseRecord`] to the task's history, giving an auditable narrative of
//! the run.

use crate::error::{MusterError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

mod mutations;

/// Regex pattern for valid task ids.
static TASK_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TASK-\d{3,}$").expect("Invalid task id regex"));

/// Lifecycle states of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet matched.
    Pending,
    /// Team formation in progress.
    Matching,
    /// Capability-sharing rounds in progress.
    Exchanging,
    /// Executor running.
    Executing,
    /// Performance evaluation in progress.
    Scoring,
    /// Terminal: executed successfully.
    Completed,
    /// Terminal: execution failed or timed out.
    Failed,
}

impl TaskStatus {
    /// Position of this status along the pipeline. Both terminal states
    /// share the final rank.
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Matching => 1,
            TaskStatus::Exchanging => 2,
            TaskStatus::Executing => 3,
            TaskStatus::Scoring => 4,
            TaskStatus::Completed | TaskStatus::Failed => 5,
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Matching => "matching",
            TaskStatus::Exchanging => "exchanging",
            TaskStatus::Executing => "executing",
            TaskStatus::Scoring => "scoring",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Phases of the coordination pipeline, as recorded in task history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Match,
    Exchange,
    Execute,
    Score,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Phase::Match => "match",
            Phase::Exchange => "exchange",
            Phase::Execute => "execute",
            Phase::Score => "score",
        };
        write!(f, "{}", label)
    }
}

/// One entry of a task's append-only phase history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    /// Which phase produced this record.
    pub phase: Phase,

    /// When the record was appended.
    pub ts: DateTime<Utc>,

    /// Phase-specific payload (selected agents, contributions, outcome...).
    pub details: Value,
}

/// Outcome payload of an executed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether execution succeeded.
    pub success: bool,

    /// Success payload or error message.
    pub message: String,
}

/// A task in the coordination system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier (e.g., "TASK-001").
    pub id: String,

    /// What the task is about.
    pub description: String,

    /// Required capabilities. Order is insignificant for matching but
    /// preserved for display.
    #[serde(default)]
    pub requirements: Vec<String>,

    /// Current lifecycle state.
    pub status: TaskStatus,

    /// Ids of the agents selected for this task, best fitness first.
    #[serde(default)]
    pub assigned_agents: Vec<String>,

    /// Formation score of the assigned team.
    #[serde(default)]
    pub team_score: f64,

    /// Wall-clock execution time in seconds.
    #[serde(default)]
    pub execution_time: f64,

    /// Execution outcome, set by the execute phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// When execution started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When execution finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Append-only log of phase records.
    #[serde(default)]
    pub history: Vec<PhaseRecord>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        requirements: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            requirements,
            status: TaskStatus::Pending,
            assigned_agents: Vec::new(),
            team_score: 0.0,
            execution_time: 0.0,
            result: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            history: Vec::new(),
        }
    }

    /// Whether the execute phase recorded a successful outcome.
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Generate a task id from a sequence number.
pub fn generate_task_id(number: u32) -> String {
    format!("TASK-{:03}", number)
}

/// Validate a task id against the `TASK-NNN` pattern.
pub fn validate_task_id(id: &str) -> Result<()> {
    if TASK_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(MusterError::UserError(format!(
            "invalid task id '{}': expected format TASK-NNN (e.g., TASK-001)",
            id
        )))
    }
}
