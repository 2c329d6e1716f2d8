//! Constraint-aware team planning.
//!
//! Unlike the match phase, which works purely from fitness and thresholds,
//! the optimizer answers "who should work on this" under explicit
//! constraints: hard includes, hard excludes, a reliability floor, and a
//! size cap. It never mutates anything; the output is a plan, not an
//! assignment.

use crate::agent::registry::AgentRegistry;
use crate::error::{MusterError, Result};
use std::cmp::Ordering;

/// Constraints applied when planning a team.
#[derive(Debug, Clone)]
pub struct TeamConstraints {
    /// Hard cap on team size.
    pub max_team_size: usize,

    /// Minimum reliability for optional members. Required members bypass it.
    pub min_reliability: f64,

    /// Agents that must not appear in the team.
    pub exclude: Vec<String>,

    /// Agents that must appear in the team.
    pub require: Vec<String>,
}

impl Default for TeamConstraints {
    fn default() -> Self {
        Self {
            max_team_size: 4,
            min_reliability: 0.5,
            exclude: Vec::new(),
            require: Vec::new(),
        }
    }
}

/// A planned team with its mean fitness for the requirement set.
#[derive(Debug, Clone)]
pub struct OptimizedTeam {
    /// Selected agent ids, required members first.
    pub agents: Vec<String>,

    /// Mean fitness of the selection, 0.0 for an empty plan.
    pub score: f64,
}

/// Relative ranking of two candidate teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    First,
    Second,
    Tie,
}

/// Result of comparing two candidate teams for the same requirements.
#[derive(Debug, Clone)]
pub struct TeamComparison {
    /// Mean fitness of the first team.
    pub first_score: f64,

    /// Mean fitness of the second team.
    pub second_score: f64,

    /// Which team scored higher.
    pub winner: Winner,
}

/// Plan the best team for a requirement set under the given constraints.
///
/// Required agents are seated first, in the order given. Remaining seats are
/// filled by fitness (ties keep registration order) from agents that are not
/// excluded, not already seated, and at or above the reliability floor.
/// Contradictory constraints are user errors: unknown required agents, a
/// required agent that is also excluded, or more required agents than seats.
pub fn optimize_team(
    registry: &AgentRegistry,
    requirements: &[String],
    constraints: &TeamConstraints,
) -> Result<OptimizedTeam> {
    if constraints.max_team_size == 0 {
        return Err(MusterError::UserError(
            "max_team_size must be at least 1".to_string(),
        ));
    }

    if constraints.require.len() > constraints.max_team_size {
        return Err(MusterError::UserError(format!(
            "{} required agents do not fit in a team of {}",
            constraints.require.len(),
            constraints.max_team_size
        )));
    }

    for id in &constraints.require {
        if !registry.contains(id) {
            return Err(MusterError::UserError(format!(
                "required agent '{}' is not registered",
                id
            )));
        }
        if constraints.exclude.contains(id) {
            return Err(MusterError::UserError(format!(
                "agent '{}' is both required and excluded",
                id
            )));
        }
    }

    let mut team: Vec<String> = constraints.require.clone();

    let mut candidates: Vec<(&str, f64)> = registry
        .iter()
        .filter(|agent| {
            !team.contains(&agent.id)
                && !constraints.exclude.contains(&agent.id)
                && agent.reliability >= constraints.min_reliability
        })
        .map(|agent| (agent.id.as_str(), agent.fitness(requirements)))
        .collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    for (id, _) in candidates {
        if team.len() >= constraints.max_team_size {
            break;
        }
        team.push(id.to_string());
    }

    let score = mean_fitness(registry, &team, requirements);
    Ok(OptimizedTeam {
        agents: team,
        score,
    })
}

/// Compare two candidate teams for the same requirement set.
///
/// Every named agent must be registered; an unknown id is a user error
/// rather than a silently weaker team.
pub fn compare_teams(
    registry: &AgentRegistry,
    requirements: &[String],
    first: &[String],
    second: &[String],
) -> Result<TeamComparison> {
    for id in first.iter().chain(second.iter()) {
        if !registry.contains(id) {
            return Err(MusterError::UserError(format!(
                "agent '{}' is not registered",
                id
            )));
        }
    }

    let first_score = mean_fitness(registry, first, requirements);
    let second_score = mean_fitness(registry, second, requirements);

    let winner = match first_score.partial_cmp(&second_score) {
        Some(Ordering::Greater) => Winner::First,
        Some(Ordering::Less) => Winner::Second,
        _ => Winner::Tie,
    };

    Ok(TeamComparison {
        first_score,
        second_score,
        winner,
    })
}

fn mean_fitness(registry: &AgentRegistry, team: &[String], requirements: &[String]) -> f64 {
    if team.is_empty() {
        return 0.0;
    }
    let total: f64 = team
        .iter()
        .filter_map(|id| registry.get(id))
        .map(|agent| agent.fitness(requirements))
        .sum();
    total / team.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentProfile;

    fn agent(id: &str, capabilities: &[&str]) -> AgentProfile {
        AgentProfile::new(
            id,
            id.to_uppercase(),
            capabilities.iter().map(|c| c.to_string()),
            "general",
        )
    }

    fn reqs(items: &[&str]) -> Vec<String> {
        items.iter().map(|r| r.to_string()).collect()
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn fills_seats_by_fitness() {
        let mut registry = AgentRegistry::new();
        registry.insert(agent("writer", &["writing"]));
        registry.insert(agent("coder", &["coding", "testing"]));
        registry.insert(agent("tester", &["testing"]));

        let team = optimize_team(
            &registry,
            &reqs(&["coding", "testing"]),
            &TeamConstraints {
                max_team_size: 2,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(team.agents, vec!["coder", "tester"]);
        // mean of 1.0 and 0.8
        assert!((team.score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn require_and_exclude_are_honored() {
        let mut registry = AgentRegistry::new();
        registry.insert(agent("a", &["coding"]));
        registry.insert(agent("b", &["writing"]));

        let team = optimize_team(
            &registry,
            &reqs(&["coding"]),
            &TeamConstraints {
                max_team_size: 1,
                exclude: ids(&["a"]),
                require: ids(&["b"]),
                ..Default::default()
            },
        )
        .unwrap();

        // b takes the only seat even though a is the better fit
        assert_eq!(team.agents, vec!["b"]);
    }

    #[test]
    fn reliability_floor_filters_optional_members() {
        let mut registry = AgentRegistry::new();
        let mut flaky = agent("flaky", &["coding"]);
        flaky.reliability = 0.3;
        registry.insert(flaky);
        registry.insert(agent("solid", &["coding"]));

        let team = optimize_team(&registry, &reqs(&["coding"]), &TeamConstraints::default())
            .unwrap();
        assert_eq!(team.agents, vec!["solid"]);
    }

    #[test]
    fn required_members_bypass_the_reliability_floor() {
        let mut registry = AgentRegistry::new();
        let mut flaky = agent("flaky", &["coding"]);
        flaky.reliability = 0.1;
        registry.insert(flaky);

        let team = optimize_team(
            &registry,
            &reqs(&["coding"]),
            &TeamConstraints {
                require: ids(&["flaky"]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(team.agents, vec!["flaky"]);
    }

    #[test]
    fn contradictory_constraints_are_rejected() {
        let mut registry = AgentRegistry::new();
        registry.insert(agent("a", &["coding"]));

        // Unknown required agent
        assert!(
            optimize_team(
                &registry,
                &[],
                &TeamConstraints {
                    require: ids(&["ghost"]),
                    ..Default::default()
                },
            )
            .is_err()
        );

        // Required and excluded at once
        assert!(
            optimize_team(
                &registry,
                &[],
                &TeamConstraints {
                    require: ids(&["a"]),
                    exclude: ids(&["a"]),
                    ..Default::default()
                },
            )
            .is_err()
        );

        // More required agents than seats
        assert!(
            optimize_team(
                &registry,
                &[],
                &TeamConstraints {
                    max_team_size: 0,
                    ..Default::default()
                },
            )
            .is_err()
        );
    }

    #[test]
    fn empty_registry_plans_an_empty_team() {
        let registry = AgentRegistry::new();
        let team =
            optimize_team(&registry, &reqs(&["coding"]), &TeamConstraints::default()).unwrap();
        assert!(team.agents.is_empty());
        assert_eq!(team.score, 0.0);
    }

    #[test]
    fn compare_picks_the_better_team() {
        let mut registry = AgentRegistry::new();
        registry.insert(agent("coder", &["coding"]));
        registry.insert(agent("writer", &["writing"]));

        let comparison = compare_teams(
            &registry,
            &reqs(&["coding"]),
            &ids(&["writer"]),
            &ids(&["coder"]),
        )
        .unwrap();

        assert_eq!(comparison.winner, Winner::Second);
        assert!(comparison.second_score > comparison.first_score);
    }

    #[test]
    fn compare_identical_teams_is_a_tie() {
        let mut registry = AgentRegistry::new();
        registry.insert(agent("a", &["coding"]));

        let comparison =
            compare_teams(&registry, &reqs(&["coding"]), &ids(&["a"]), &ids(&["a"])).unwrap();
        assert_eq!(comparison.winner, Winner::Tie);
    }

    #[test]
    fn compare_rejects_unknown_agents() {
        let registry = AgentRegistry::new();
        assert!(compare_teams(&registry, &[], &ids(&["ghost"]), &[]).is_err());
    }
}
