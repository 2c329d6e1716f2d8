//! Exchange phase: structured pre-execution rounds.
//!
//! Each round records, per team member, which of the task's requirements
//! that member's capabilities cover. The content is derived purely from
//! profiles and requirements, so running the same round twice produces the
//! same contributions. An empty team yields zero-participant rounds rather
//! than an error.

use crate::agent::registry::AgentRegistry;
use crate::error::Result;
use crate::task::{Phase, Task, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One agent's contribution within an exchange round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    /// Contributing agent id.
    pub agent: String,

    /// Requirements this agent's capabilities cover, in requirement order.
    pub expertise: Vec<String>,
}

/// One completed exchange round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRound {
    /// 1-based round number.
    pub round: u32,

    /// Contributions in team assignment order.
    pub contributions: Vec<Contribution>,
}

/// Record of the whole exchange phase for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeReport {
    /// Task the exchange ran for.
    pub task_id: String,

    /// All rounds, in order.
    pub rounds: Vec<ExchangeRound>,
}

/// Run the configured number of exchange rounds for a matched task.
///
/// Moves the task to `Exchanging` and appends an `exchange` record carrying
/// the full round contributions to its history, so the narrative survives in
/// the task snapshot. The registry is only read.
pub fn exchange(task: &mut Task, registry: &AgentRegistry, rounds: u32) -> Result<ExchangeReport> {
    task.advance(TaskStatus::Exchanging)?;

    let mut report = ExchangeReport {
        task_id: task.id.clone(),
        rounds: Vec::with_capacity(rounds as usize),
    };

    for round in 1..=rounds {
        let contributions = task
            .assigned_agents
            .iter()
            .filter_map(|id| registry.get(id))
            .map(|agent| Contribution {
                agent: agent.id.clone(),
                expertise: task
                    .requirements
                    .iter()
                    .filter(|req| agent.capabilities.contains(*req))
                    .cloned()
                    .collect(),
            })
            .collect();

        report.rounds.push(ExchangeRound {
            round,
            contributions,
        });
    }

    task.record_phase(
        Phase::Exchange,
        json!({
            "rounds": rounds,
            "participants": task.assigned_agents,
            "exchanges": report.rounds,
        }),
    );

    Ok(report)
}
