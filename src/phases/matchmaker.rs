//! Match phase: team formation by fitness.
//!
//! Every registered agent is scored against the task's requirements; agents
//! below the match threshold are discarded, the rest are sorted by fitness
//! descending with ties broken by registry insertion order (a stable sort
//! over an insertion-ordered scan, so behavior does not depend on any map
//! iteration order). Zero eligible agents is a valid outcome: the task gets
//! an empty team and a formation score of 0, and callers must handle the
//! empty team downstream.

use crate::agent::registry::AgentRegistry;
use crate::config::CoordinationConfig;
use crate::error::Result;
use crate::task::{Phase, Task, TaskStatus};
use crate::team::TeamComposition;
use serde_json::json;
use std::cmp::Ordering;

/// Form a team for the task and record it.
///
/// Side effects on the task: status moves to `Matching`, the selection is
/// stored in `assigned_agents`/`team_score`, and a `match` record is
/// appended to the history. The registry is only read.
pub fn match_team(
    task: &mut Task,
    registry: &AgentRegistry,
    config: &CoordinationConfig,
) -> Result<TeamComposition> {
    task.advance(TaskStatus::Matching)?;

    // Candidates in insertion order, so the stable sort below keeps
    // insertion order as the tie-break for equal fitness.
    let mut candidates: Vec<(&str, f64)> = registry
        .iter()
        .map(|agent| (agent.id.as_str(), agent.fitness(&task.requirements)))
        .filter(|(_, fitness)| *fitness >= config.match_threshold)
        .collect();

    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let team_size = candidates
        .len()
        .clamp(config.team_size_min, config.team_size_max);
    candidates.truncate(team_size);

    let selected: Vec<String> = candidates.iter().map(|(id, _)| id.to_string()).collect();

    let formation_score = if candidates.is_empty() {
        0.0
    } else {
        candidates.iter().map(|(_, f)| f).sum::<f64>() / candidates.len() as f64
    };

    let mean_reliability = mean(selected.iter().filter_map(|id| {
        registry.get(id).map(|a| a.reliability)
    }))
    .unwrap_or(0.0);

    // Guard against division by zero: an empty team or zero mean speed
    // falls back to unit speed for the time estimate.
    let mean_speed = mean(selected.iter().filter_map(|id| registry.get(id).map(|a| a.speed)))
        .filter(|s| *s > 0.0)
        .unwrap_or(1.0);

    let estimated_completion_time =
        task.requirements.len() as f64 * config.base_unit_minutes / mean_speed;

    task.assign_team(selected.clone(), formation_score);
    task.record_phase(
        Phase::Match,
        json!({
            "agents": selected,
            "score": formation_score,
        }),
    );

    Ok(TeamComposition {
        task_id: task.id.clone(),
        agents: task.assigned_agents.clone(),
        formation_score,
        estimated_success_rate: mean_reliability * formation_score,
        estimated_completion_time,
    })
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 { None } else { Some(sum / count as f64) }
}
