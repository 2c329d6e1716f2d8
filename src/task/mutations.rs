//! Mutation helpers for phase transitions.

use super::{Phase, PhaseRecord, Task, TaskResult, TaskStatus};
use crate::error::{MusterError, Result};
use chrono::Utc;
use serde_json::Value;

impl Task {
    /// Advance the task to the next status.
    ///
    /// Transitions must move strictly forward along the pipeline; a move to
    /// the same or an earlier status, or any move out of a terminal status,
    /// is rejected.
    pub fn advance(&mut self, next: TaskStatus) -> Result<()> {
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            return Err(MusterError::UserError(format!(
                "invalid status transition for task '{}': {} -> {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Append a phase record to the task history.
    pub fn record_phase(&mut self, phase: Phase, details: Value) {
        self.history.push(PhaseRecord {
            phase,
            ts: Utc::now(),
            details,
        });
    }

    /// Set the assigned team and its formation score.
    pub fn assign_team(&mut self, agents: Vec<String>, formation_score: f64) {
        self.assigned_agents = agents;
        self.team_score = formation_score;
    }

    /// Mark execution as started.
    pub fn mark_started(&mut self) {
        self.started_at = Some(Utc::now());
    }

    /// Record the execution outcome and move to the matching terminal state.
    pub fn mark_finished(&mut self, success: bool, message: String, duration_seconds: f64) {
        self.execution_time = duration_seconds;
        self.result = Some(TaskResult { success, message });
        self.completed_at = Some(Utc::now());
        self.status = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task() -> Task {
        Task::new("TASK-001", "Test", vec![])
    }

    #[test]
    fn advance_moves_forward() {
        let mut task = task();
        task.advance(TaskStatus::Matching).unwrap();
        task.advance(TaskStatus::Exchanging).unwrap();
        task.advance(TaskStatus::Executing).unwrap();
        assert_eq!(task.status, TaskStatus::Executing);
    }

    #[test]
    fn advance_can_skip_intermediate_states() {
        let mut task = task();
        task.advance(TaskStatus::Executing).unwrap();
        assert_eq!(task.status, TaskStatus::Executing);
    }

    #[test]
    fn advance_rejects_backward_transition() {
        let mut task = task();
        task.advance(TaskStatus::Exchanging).unwrap();
        assert!(task.advance(TaskStatus::Matching).is_err());
        assert_eq!(task.status, TaskStatus::Exchanging);
    }

    #[test]
    fn advance_rejects_same_status() {
        let mut task = task();
        task.advance(TaskStatus::Matching).unwrap();
        assert!(task.advance(TaskStatus::Matching).is_err());
    }

    #[test]
    fn advance_rejects_leaving_terminal_status() {
        let mut task = task();
        task.mark_finished(false, "boom".to_string(), 0.1);
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.advance(TaskStatus::Completed).is_err());
        assert!(task.advance(TaskStatus::Scoring).is_err());
    }

    #[test]
    fn mark_finished_sets_terminal_state_and_result() {
        let mut task = task();
        task.mark_started();
        task.mark_finished(true, "all good".to_string(), 1.5);

        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.succeeded());
        assert_eq!(task.execution_time, 1.5);
        assert!(task.completed_at.is_some());
        let result = task.result.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "all good");
    }

    #[test]
    fn record_phase_appends_in_order() {
        let mut task = task();
        task.record_phase(Phase::Match, json!({"agents": []}));
        task.record_phase(Phase::Exchange, json!({"rounds": 2}));

        assert_eq!(task.history.len(), 2);
        assert_eq!(task.history[0].phase, Phase::Match);
        assert_eq!(task.history[1].phase, Phase::Exchange);
        assert_eq!(task.history[1].details["rounds"], 2);
    }

    #[test]
    fn assign_team_sets_agents_and_score() {
        let mut task = task();
        task.assign_team(vec!["alpha".to_string(), "beta".to_string()], 0.85);
        assert_eq!(task.assigned_agents.len(), 2);
        assert_eq!(task.team_score, 0.85);
    }
}
