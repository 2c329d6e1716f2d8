//! Insertion-ordered agent registry.
//!
//! The registry is pure data access: lookup and insert, nothing else.
//! Iteration order is insertion order, which is the explicit tie-break key
//! for equal fitness scores during matching. Agents are never removed;
//! re-registering an existing id replaces the profile in place so the
//! insertion index (and with it the tie-break order) is stable.

use super::AgentProfile;
use std::collections::HashMap;

/// Registry of agent profiles, iterated in insertion order.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentProfile>,
    index: HashMap<String, usize>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from an ordered profile list (snapshot load).
    ///
    /// Later duplicates replace earlier ones in place, mirroring `insert`.
    pub fn from_agents(agents: Vec<AgentProfile>) -> Self {
        let mut registry = Self::new();
        for agent in agents {
            registry.insert(agent);
        }
        registry
    }

    /// Insert a profile, replacing any existing profile with the same id.
    ///
    /// Replacement keeps the original insertion position.
    pub fn insert(&mut self, agent: AgentProfile) {
        match self.index.get(&agent.id) {
            Some(&pos) => self.agents[pos] = agent,
            None => {
                self.index.insert(agent.id.clone(), self.agents.len());
                self.agents.push(agent);
            }
        }
    }

    /// Look up a profile by id.
    pub fn get(&self, id: &str) -> Option<&AgentProfile> {
        self.index.get(id).map(|&pos| &self.agents[pos])
    }

    /// Look up a profile by id for mutation.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut AgentProfile> {
        match self.index.get(id) {
            Some(&pos) => Some(&mut self.agents[pos]),
            None => None,
        }
    }

    /// Whether an id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Iterate profiles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentProfile> {
        self.agents.iter()
    }

    /// Iterate profiles mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentProfile> {
        self.agents.iter_mut()
    }

    /// The ordered profile list, for snapshot saves.
    pub fn as_slice(&self) -> &[AgentProfile] {
        &self.agents
    }
}
