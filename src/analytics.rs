//! Read-only analytics over coordination history.
//!
//! Everything here is derived from the completed-task archive and the
//! registry; nothing is mutated and nothing is persisted. An empty history
//! is a valid input and yields zeroed metrics rather than an error.

use crate::agent::registry::AgentRegistry;
use crate::task::Task;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Weight of the capability match ratio in recommendation confidence.
const CONFIDENCE_WEIGHT_MATCH: f64 = 0.5;

/// Weight of historical performance in recommendation confidence.
const CONFIDENCE_WEIGHT_PERFORMANCE: f64 = 0.3;

/// Weight of reliability in recommendation confidence.
const CONFIDENCE_WEIGHT_RELIABILITY: f64 = 0.2;

/// Neutral match ratio when a requirement set is empty.
const NEUTRAL_MATCH_RATIO: f64 = 0.5;

/// Prediction for a team with no history and no known members.
const PREDICTION_NEUTRAL: f64 = 0.5;

/// Aggregate view of the completed-task archive.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinationMetrics {
    /// Number of archived tasks.
    pub total_tasks: usize,

    /// How many of them succeeded.
    pub successful_tasks: usize,

    /// How many of them failed.
    pub failed_tasks: usize,

    /// Successful fraction, 0.0 when the archive is empty.
    pub success_rate: f64,

    /// Mean wall-clock execution time in seconds.
    pub average_execution_time: f64,

    /// Mean assigned team size.
    pub average_team_size: f64,

    /// Archived task count per agent, keyed by agent id.
    pub agent_utilization: BTreeMap<String, usize>,
}

/// Compute metrics over the archived tasks.
pub fn calculate_metrics(completed: &[Task]) -> CoordinationMetrics {
    let total = completed.len();
    let successful = completed.iter().filter(|t| t.succeeded()).count();

    let mut utilization: BTreeMap<String, usize> = BTreeMap::new();
    for task in completed {
        for agent in &task.assigned_agents {
            *utilization.entry(agent.clone()).or_default() += 1;
        }
    }

    let (success_rate, average_execution_time, average_team_size) = if total == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let n = total as f64;
        (
            successful as f64 / n,
            completed.iter().map(|t| t.execution_time).sum::<f64>() / n,
            completed
                .iter()
                .map(|t| t.assigned_agents.len() as f64)
                .sum::<f64>()
                / n,
        )
    };

    CoordinationMetrics {
        total_tasks: total,
        successful_tasks: successful,
        failed_tasks: total - successful,
        success_rate,
        average_execution_time,
        average_team_size,
        agent_utilization: utilization,
    }
}

/// One agent ranked by overall standing.
#[derive(Debug, Clone, Serialize)]
pub struct TopPerformer {
    /// Agent id.
    pub agent_id: String,

    /// `performance_score * reliability`.
    pub rating: f64,
}

/// Rank agents by `performance_score * reliability`, best first.
///
/// Ties keep registration order.
pub fn top_performers(registry: &AgentRegistry, limit: usize) -> Vec<TopPerformer> {
    let mut performers: Vec<TopPerformer> = registry
        .iter()
        .map(|agent| TopPerformer {
            agent_id: agent.id.clone(),
            rating: agent.performance_score * agent.reliability,
        })
        .collect();

    performers.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal));
    performers.truncate(limit);
    performers
}

/// Accumulated record of two agents serving on the same team.
#[derive(Debug, Clone, Serialize)]
pub struct PairStat {
    /// The two agent ids, lexicographically ordered.
    pub agents: (String, String),

    /// How many archived tasks both appeared on.
    pub shared_tasks: usize,

    /// Sum of the team scores of those tasks.
    pub combined_score: f64,
}

/// Rank co-assigned agent pairs by accumulated team score, best first.
///
/// Pairs are keyed by the sorted id pair so (a, b) and (b, a) accumulate
/// into one entry.
pub fn collaborative_pairs(completed: &[Task], limit: usize) -> Vec<PairStat> {
    let mut pairs: BTreeMap<(String, String), (usize, f64)> = BTreeMap::new();

    for task in completed {
        let team = &task.assigned_agents;
        for i in 0..team.len() {
            for j in (i + 1)..team.len() {
                let mut key = (team[i].clone(), team[j].clone());
                if key.0 > key.1 {
                    std::mem::swap(&mut key.0, &mut key.1);
                }
                let entry = pairs.entry(key).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += task.team_score;
            }
        }
    }

    let mut stats: Vec<PairStat> = pairs
        .into_iter()
        .map(|(agents, (shared_tasks, combined_score))| PairStat {
            agents,
            shared_tasks,
            combined_score,
        })
        .collect();

    stats.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(Ordering::Equal)
    });
    stats.truncate(limit);
    stats
}

/// Outcome statistics for one distinct requirement set.
#[derive(Debug, Clone, Serialize)]
pub struct RequirementSetStats {
    /// Archived tasks with this requirement set.
    pub total_tasks: usize,

    /// How many of them succeeded.
    pub successful_tasks: usize,

    /// Successful fraction.
    pub success_rate: f64,

    /// Running average of the team scores of those tasks.
    pub average_score: f64,
}

/// Group archived tasks by their (sorted) requirement set.
///
/// The map key is the sorted, comma-joined requirement list, so requirement
/// order at submission does not split a set into separate entries.
pub fn requirement_set_stats(completed: &[Task]) -> BTreeMap<String, RequirementSetStats> {
    let mut grouped: BTreeMap<String, (usize, usize, f64)> = BTreeMap::new();

    for task in completed {
        let mut requirements = task.requirements.clone();
        requirements.sort();
        let key = requirements.join(",");

        let entry = grouped.entry(key).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if task.succeeded() {
            entry.1 += 1;
        }
        entry.2 += task.team_score;
    }

    grouped
        .into_iter()
        .map(|(key, (total, successful, score_sum))| {
            (
                key,
                RequirementSetStats {
                    total_tasks: total,
                    successful_tasks: successful,
                    success_rate: successful as f64 / total as f64,
                    average_score: score_sum / total as f64,
                },
            )
        })
        .collect()
}

/// One ranked agent suggestion for a requirement set.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRecommendation {
    /// Suggested agent.
    pub agent_id: String,

    /// Confidence in [0, 1], higher is better.
    pub confidence: f64,

    /// Which of the requirements this agent covers.
    pub matched_requirements: Vec<String>,
}

/// Rank agents for a requirement set, best first.
///
/// Confidence weighs the capability match heavier than fitness does, since a
/// recommendation is about the specific task rather than general standing:
///
/// ```text
/// match_ratio * 0.5 + historical_avg * 0.3 + reliability * 0.2
/// ```
///
/// `historical_avg` is the mean team score of the successful archived tasks
/// the agent served on; agents with no successful history fall back to
/// their performance score. Ties keep registration order.
pub fn recommend_agents(
    registry: &AgentRegistry,
    completed: &[Task],
    requirements: &[String],
    limit: usize,
) -> Vec<AgentRecommendation> {
    let mut recommendations: Vec<AgentRecommendation> = registry
        .iter()
        .map(|agent| {
            let matched: Vec<String> = requirements
                .iter()
                .filter(|req| agent.capabilities.contains(req.as_str()))
                .cloned()
                .collect();

            let match_ratio = if requirements.is_empty() {
                NEUTRAL_MATCH_RATIO
            } else {
                matched.len() as f64 / requirements.len() as f64
            };

            let historical_avg =
                successful_team_score_avg(completed, &agent.id).unwrap_or(agent.performance_score);

            let confidence = (match_ratio * CONFIDENCE_WEIGHT_MATCH
                + historical_avg * CONFIDENCE_WEIGHT_PERFORMANCE
                + agent.reliability * CONFIDENCE_WEIGHT_RELIABILITY)
                .clamp(0.0, 1.0);

            AgentRecommendation {
                agent_id: agent.id.clone(),
                confidence,
                matched_requirements: matched,
            }
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    recommendations.truncate(limit);
    recommendations
}

fn successful_team_score_avg(completed: &[Task], agent_id: &str) -> Option<f64> {
    let scores: Vec<f64> = completed
        .iter()
        .filter(|t| t.succeeded() && t.assigned_agents.iter().any(|id| id == agent_id))
        .map(|t| t.team_score)
        .collect();

    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// Predict the success probability of a hypothetical team.
///
/// If this exact team (as a set) has run archived tasks, its historical
/// success ratio is the prediction. Otherwise the mean performance score of
/// the known members stands in, and a team with no history and no known
/// members gets a neutral 0.5.
pub fn predict_success_rate(
    registry: &AgentRegistry,
    completed: &[Task],
    agent_ids: &[String],
) -> f64 {
    let mut team: Vec<&str> = agent_ids.iter().map(String::as_str).collect();
    team.sort_unstable();
    team.dedup();

    let history: Vec<bool> = completed
        .iter()
        .filter(|t| {
            let mut assigned: Vec<&str> =
                t.assigned_agents.iter().map(String::as_str).collect();
            assigned.sort_unstable();
            assigned.dedup();
            assigned == team
        })
        .map(|t| t.succeeded())
        .collect();

    if !history.is_empty() {
        let successes = history.iter().filter(|s| **s).count();
        return successes as f64 / history.len() as f64;
    }

    let performances: Vec<f64> = agent_ids
        .iter()
        .filter_map(|id| registry.get(id))
        .map(|agent| agent.performance_score)
        .collect();

    if performances.is_empty() {
        PREDICTION_NEUTRAL
    } else {
        (performances.iter().sum::<f64>() / performances.len() as f64).clamp(0.0, 1.0)
    }
}
