//! Agent profile model for muster.
//!
//! An agent is a capability-tagged worker tracked by the registry. Profiles
//! carry the learned signal that feeds future team formation: performance,
//! reliability, speed, and collaboration scores, plus raw completed/failed
//! counters.
//!
//! Profiles are owned by the [`registry::AgentRegistry`]; the execute and
//! score phases are the only writers, along with the periodic reliability
//! recompute pass.

use crate::error::{MusterError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub mod registry;

/// Regex pattern for valid agent ids.
static AGENT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,63}$").expect("Invalid agent id regex"));

/// Weight of the capability match ratio in the fitness score.
const FITNESS_WEIGHT_MATCH: f64 = 0.4;

/// Weight of each profile component (performance, reliability, collaboration).
const FITNESS_WEIGHT_PROFILE: f64 = 0.2;

/// Match ratio used when a task has no requirements at all.
const EMPTY_REQUIREMENTS_MATCH_RATIO: f64 = 0.5;

/// Profile of an agent in the coordination system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Unique, stable agent identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Capability tags, matched against task requirements by set membership.
    /// Stored sorted for deterministic serialization.
    #[serde(default)]
    pub capabilities: BTreeSet<String>,

    /// Moving average of task performance scores. Starts at 1.0 and
    /// converges near 1.0; may drift slightly above by design.
    #[serde(default = "default_unit_score")]
    pub performance_score: f64,

    /// Number of tasks this agent completed successfully.
    #[serde(default)]
    pub tasks_completed: u32,

    /// Number of tasks this agent was on that failed.
    #[serde(default)]
    pub tasks_failed: u32,

    /// Free-form specialization tag.
    #[serde(default = "default_specialization")]
    pub specialization: String,

    /// Historical success ratio in [0, 1], recomputed periodically from the
    /// completed/failed counters. Agents with no history keep 1.0.
    #[serde(default = "default_unit_score")]
    pub reliability: f64,

    /// Work rate in tasks per hour, used for completion time estimates.
    #[serde(default = "default_unit_score")]
    pub speed: f64,

    /// Track record of working in successful teams, in [0, 1].
    #[serde(default = "default_unit_score")]
    pub collaboration_score: f64,

    /// Updated on every task assignment.
    #[serde(default = "default_last_active")]
    pub last_active: DateTime<Utc>,
}

fn default_unit_score() -> f64 {
    1.0
}

fn default_specialization() -> String {
    "general".to_string()
}

fn default_last_active() -> DateTime<Utc> {
    Utc::now()
}

impl AgentProfile {
    /// Create a fresh profile with default scores.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = String>,
        specialization: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities: capabilities.into_iter().collect(),
            performance_score: default_unit_score(),
            tasks_completed: 0,
            tasks_failed: 0,
            specialization: specialization.into(),
            reliability: default_unit_score(),
            speed: default_unit_score(),
            collaboration_score: default_unit_score(),
            last_active: Utc::now(),
        }
    }

    /// Calculate how fit this agent is for a requirement set.
    ///
    /// The score blends the capability match ratio with the agent's learned
    /// profile:
    ///
    /// ```text
    /// match_ratio * 0.4 + performance * 0.2 + reliability * 0.2 + collaboration * 0.2
    /// ```
    ///
    /// An empty requirement set yields a neutral match ratio of 0.5 rather
    /// than zero; the result is clamped to [0, 1] since the performance
    /// score may drift above 1.0.
    pub fn fitness(&self, requirements: &[String]) -> f64 {
        let match_ratio = if requirements.is_empty() {
            EMPTY_REQUIREMENTS_MATCH_RATIO
        } else {
            let matches = requirements
                .iter()
                .filter(|req| self.capabilities.contains(req.as_str()))
                .count();
            matches as f64 / requirements.len() as f64
        };

        let fitness = match_ratio * FITNESS_WEIGHT_MATCH
            + self.performance_score * FITNESS_WEIGHT_PROFILE
            + self.reliability * FITNESS_WEIGHT_PROFILE
            + self.collaboration_score * FITNESS_WEIGHT_PROFILE;

        fitness.clamp(0.0, 1.0)
    }

    /// Whether this agent has any recorded task history.
    pub fn has_history(&self) -> bool {
        self.tasks_completed + self.tasks_failed > 0
    }
}

/// Validate an agent id.
///
/// Ids must be lowercase alphanumeric with `-`/`_` separators, at most 64
/// characters, starting with an alphanumeric character.
pub fn validate_agent_id(id: &str) -> Result<()> {
    if AGENT_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(MusterError::UserError(format!(
            "invalid agent id '{}': expected lowercase alphanumeric with '-' or '_' separators",
            id
        )))
    }
}
