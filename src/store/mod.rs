//! Persistence contract for coordination state.
//!
//! State is persisted as two independent whole-collection snapshots: the
//! agent registry and the task store (pending + completed). Any backend
//! that can load and save whole snapshots satisfies the contract; the
//! default backend writes versioned JSON files atomically.
//!
//! Store failures always propagate. A phase must not claim completion if
//! the snapshot write for that phase failed.

use crate::agent::AgentProfile;
use crate::error::Result;
use crate::task::Task;
use serde::{Deserialize, Serialize};

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Whole-registry snapshot. Array order is registry insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsSnapshot {
    /// Schema version, checked on load.
    pub version: u32,

    /// All registered agent profiles, in insertion order.
    pub agents: Vec<AgentProfile>,
}

impl AgentsSnapshot {
    /// Wrap an ordered profile list in a current-version snapshot.
    pub fn new(agents: Vec<AgentProfile>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            agents,
        }
    }
}

/// Whole-task-store snapshot: live tasks plus the immutable completed set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksSnapshot {
    /// Schema version, checked on load.
    pub version: u32,

    /// Next sequence number for task id generation.
    pub next_task_number: u32,

    /// Tasks still moving through the pipeline.
    pub pending: Vec<Task>,

    /// Terminal tasks, read-only once archived here.
    pub completed: Vec<Task>,
}

impl TasksSnapshot {
    /// Wrap task collections in a current-version snapshot.
    pub fn new(next_task_number: u32, pending: Vec<Task>, completed: Vec<Task>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            next_task_number,
            pending,
            completed,
        }
    }
}

/// Durable load/save contract for coordination state.
pub trait CoordinationStore {
    /// Load the agent snapshot, or `None` if nothing was saved yet.
    fn load_agents(&self) -> Result<Option<AgentsSnapshot>>;

    /// Save the agent snapshot, replacing any previous one.
    fn save_agents(&self, snapshot: &AgentsSnapshot) -> Result<()>;

    /// Load the task snapshot, or `None` if nothing was saved yet.
    fn load_tasks(&self) -> Result<Option<TasksSnapshot>>;

    /// Save the task snapshot, replacing any previous one.
    fn save_tasks(&self, snapshot: &TasksSnapshot) -> Result<()>;
}
