//! Score phase: turn an execution outcome into profile updates.
//!
//! The task score blends three signals: a success bonus, time efficiency
//! relative to a 10-second reference, and the formation score of the team
//! that ran it. The score then folds into each team member's performance
//! moving average, and successful collaborations nudge collaboration scores
//! up to a cap of 1.0.

use crate::agent::registry::AgentRegistry;
use crate::error::{MusterError, Result};
use crate::task::{Phase, Task};
use serde_json::json;

/// Score awarded for a successful outcome.
const SUCCESS_BONUS: f64 = 0.5;

/// Weight of time efficiency in the task score.
const TIME_WEIGHT: f64 = 0.3;

/// Weight of the team formation score in the task score.
const TEAM_WEIGHT: f64 = 0.2;

/// Execution time (seconds) considered fully efficient.
const REFERENCE_SECONDS: f64 = 10.0;

/// Collaboration score increase per successful task, capped at 1.0.
const COLLABORATION_STEP: f64 = 0.05;

/// Outcome of scoring one task.
#[derive(Debug, Clone)]
pub struct PerformanceScore {
    /// Task that was scored.
    pub task_id: String,

    /// The task score in [0, 1].
    pub score: f64,

    /// Agents whose profiles were updated.
    pub team: Vec<String>,

    /// Whether the task had succeeded.
    pub success: bool,
}

/// Score an executed task and update its team's profiles.
///
/// The task must already be terminal; the execute phase decides success and
/// scoring never changes it. A manual score overrides the computed one and
/// must lie in [0, 1].
pub fn score(
    task: &mut Task,
    registry: &mut AgentRegistry,
    manual_score: Option<f64>,
) -> Result<PerformanceScore> {
    if !task.status.is_terminal() {
        return Err(MusterError::UserError(format!(
            "task '{}' has not been executed yet",
            task.id
        )));
    }

    if let Some(manual) = manual_score
        && !(0.0..=1.0).contains(&manual)
    {
        return Err(MusterError::UserError(format!(
            "manual score {} is outside [0, 1]",
            manual
        )));
    }

    let success = task.succeeded();
    let task_score = manual_score.unwrap_or_else(|| compute_score(task, success));

    for id in &task.assigned_agents {
        if let Some(agent) = registry.get_mut(id) {
            let count = f64::from(agent.tasks_completed);
            agent.performance_score =
                (agent.performance_score * count + task_score) / (count + 1.0);
            if success {
                agent.collaboration_score =
                    (agent.collaboration_score + COLLABORATION_STEP).min(1.0);
            }
        }
    }

    task.record_phase(
        Phase::Score,
        json!({
            "performance_score": task_score,
            "success": success,
        }),
    );

    Ok(PerformanceScore {
        task_id: task.id.clone(),
        score: task_score,
        team: task.assigned_agents.clone(),
        success,
    })
}

fn compute_score(task: &Task, success: bool) -> f64 {
    let success_bonus = if success { SUCCESS_BONUS } else { 0.0 };
    let time_efficiency = (REFERENCE_SECONDS / (task.execution_time + 1.0)).min(1.0);
    success_bonus + time_efficiency * TIME_WEIGHT + task.team_score * TEAM_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentProfile;
    use crate::task::TaskStatus;

    fn registry_with(ids: &[&str]) -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        for id in ids {
            registry.insert(AgentProfile::new(
                *id,
                id.to_uppercase(),
                vec!["coding".to_string()],
                "general",
            ));
        }
        registry
    }

    fn finished_task(team: &[&str], team_score: f64, success: bool, secs: f64) -> Task {
        let mut task = Task::new("TASK-001", "Test", vec!["coding".to_string()]);
        task.advance(TaskStatus::Matching).unwrap();
        task.assign_team(team.iter().map(|a| a.to_string()).collect(), team_score);
        task.mark_finished(success, "done".to_string(), secs);
        task
    }

    #[test]
    fn successful_fast_task_with_perfect_team_scores_one() {
        let mut registry = registry_with(&["a"]);
        // Mirror the post-execute state: the success already counted
        registry.get_mut("a").unwrap().tasks_completed = 1;
        let mut task = finished_task(&["a"], 1.0, true, 0.0);

        let result = score(&mut task, &mut registry, None).unwrap();

        // 0.5 + min(1, 10/1)*0.3 + 1.0*0.2
        assert!((result.score - 1.0).abs() < 1e-9);
        assert!(result.success);
        assert_eq!(result.team, vec!["a"]);
    }

    #[test]
    fn failed_task_score_and_moving_average() {
        let mut registry = registry_with(&["a"]);
        let mut task = finished_task(&["a"], 0.5, false, 0.0);

        let result = score(&mut task, &mut registry, None).unwrap();

        // 0 + 1.0*0.3 + 0.5*0.2 = 0.4
        assert!((result.score - 0.4).abs() < 1e-9);
        // tasks_completed is still 0 after a failure: (1.0*0 + 0.4)/1
        let agent = registry.get("a").unwrap();
        assert!((agent.performance_score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn slow_task_loses_time_efficiency() {
        let mut registry = registry_with(&["a"]);
        let mut task = finished_task(&["a"], 0.0, false, 19.0);

        let result = score(&mut task, &mut registry, None).unwrap();

        // time efficiency 10/20 = 0.5, weighted 0.15
        assert!((result.score - 0.15).abs() < 1e-9);
    }

    #[test]
    fn success_nudges_collaboration_up_to_the_cap() {
        let mut registry = registry_with(&["a"]);
        {
            let agent = registry.get_mut("a").unwrap();
            agent.collaboration_score = 0.98;
            agent.tasks_completed = 1;
        }
        let mut task = finished_task(&["a"], 1.0, true, 0.0);

        score(&mut task, &mut registry, None).unwrap();

        // 0.98 + 0.05 capped
        assert!((registry.get("a").unwrap().collaboration_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn failure_leaves_collaboration_unchanged() {
        let mut registry = registry_with(&["a"]);
        registry.get_mut("a").unwrap().collaboration_score = 0.7;
        let mut task = finished_task(&["a"], 0.5, false, 0.0);

        score(&mut task, &mut registry, None).unwrap();
        assert!((registry.get("a").unwrap().collaboration_score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn manual_score_overrides_computed() {
        let mut registry = registry_with(&["a"]);
        let mut task = finished_task(&["a"], 1.0, true, 0.0);

        let result = score(&mut task, &mut registry, Some(0.25)).unwrap();
        assert_eq!(result.score, 0.25);
        assert!((registry.get("a").unwrap().performance_score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn manual_score_out_of_range_is_rejected() {
        let mut registry = registry_with(&["a"]);
        let mut task = finished_task(&["a"], 1.0, true, 0.0);

        assert!(score(&mut task, &mut registry, Some(1.5)).is_err());
        assert!(score(&mut task, &mut registry, Some(-0.1)).is_err());
    }

    #[test]
    fn scoring_an_unexecuted_task_is_rejected() {
        let mut registry = registry_with(&["a"]);
        let mut task = Task::new("TASK-001", "Test", vec![]);

        assert!(score(&mut task, &mut registry, None).is_err());
    }

    #[test]
    fn moving_average_converges_over_repeated_scores() {
        let mut registry = registry_with(&["a"]);
        {
            let agent = registry.get_mut("a").unwrap();
            agent.performance_score = 1.0;
            agent.tasks_completed = 4;
        }
        let mut task = finished_task(&["a"], 1.0, true, 0.0);

        score(&mut task, &mut registry, Some(0.5)).unwrap();

        // (1.0*4 + 0.5)/5 = 0.9
        assert!((registry.get("a").unwrap().performance_score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn score_appends_history_record() {
        let mut registry = registry_with(&["a"]);
        let mut task = finished_task(&["a"], 1.0, true, 0.0);

        score(&mut task, &mut registry, None).unwrap();

        let record = task.history.last().unwrap();
        assert_eq!(record.phase, Phase::Score);
        assert_eq!(record.details["success"], true);
    }
}
