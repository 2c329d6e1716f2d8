//! Team composition proposed by the match phase.

use serde::{Deserialize, Serialize};

/// A team of agents proposed for a task.
///
/// Compositions are ephemeral: computed fresh on every match and never
/// reused across tasks. The durable copy of the selection lives on the task
/// itself (`assigned_agents`, `team_score`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamComposition {
    /// The task this team was formed for.
    pub task_id: String,

    /// Selected agent ids, best fitness first.
    pub agents: Vec<String>,

    /// Mean fitness of the selected agents (0.0 for an empty team).
    pub formation_score: f64,

    /// Mean reliability of the team scaled by the formation score.
    pub estimated_success_rate: f64,

    /// Estimated completion time in minutes.
    pub estimated_completion_time: f64,
}

impl TeamComposition {
    /// Whether no agent cleared the match threshold.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
