//! In-memory store for embedding and tests.

use super::{AgentsSnapshot, CoordinationStore, TasksSnapshot};
use crate::error::{MusterError, Result};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    agents: Option<AgentsSnapshot>,
    tasks: Option<TasksSnapshot>,
}

/// Store that keeps snapshots in memory. State is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| MusterError::StoreError("memory store lock poisoned".to_string()))
    }
}

impl CoordinationStore for MemoryStore {
    fn load_agents(&self) -> Result<Option<AgentsSnapshot>> {
        Ok(self.lock()?.agents.clone())
    }

    fn save_agents(&self, snapshot: &AgentsSnapshot) -> Result<()> {
        self.lock()?.agents = Some(snapshot.clone());
        Ok(())
    }

    fn load_tasks(&self) -> Result<Option<TasksSnapshot>> {
        Ok(self.lock()?.tasks.clone())
    }

    fn save_tasks(&self, snapshot: &TasksSnapshot) -> Result<()> {
        self.lock()?.tasks = Some(snapshot.clone());
        Ok(())
    }
}
