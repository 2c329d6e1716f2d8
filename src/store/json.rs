//! JSON file store.
//!
//! Snapshots live in a data directory as `agents.json` and `tasks.json`,
//! written atomically (temp file + fsync + rename) so a crash never leaves
//! a half-written snapshot behind. Unknown snapshot versions are rejected
//! on load rather than silently reinterpreted.

use super::{AgentsSnapshot, CoordinationStore, SNAPSHOT_VERSION, TasksSnapshot};
use crate::error::{MusterError, Result};
use crate::fs::atomic_write_file;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// File names within the data directory.
const AGENTS_FILE: &str = "agents.json";
const TASKS_FILE: &str = "tasks.json";

/// Store backed by JSON snapshot files in a data directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    /// Create a store rooted at the given data directory.
    ///
    /// The directory is created lazily on the first save.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Path to the agents snapshot file.
    pub fn agents_path(&self) -> PathBuf {
        self.data_dir.join(AGENTS_FILE)
    }

    /// Path to the tasks snapshot file.
    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }

    fn load_snapshot<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            MusterError::StoreError(format!(
                "failed to read snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        let snapshot: T = serde_json::from_str(&content).map_err(|e| {
            MusterError::StoreError(format!(
                "failed to parse snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(Some(snapshot))
    }

    fn save_snapshot<T: Serialize>(&self, path: &Path, snapshot: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(snapshot).map_err(|e| {
            MusterError::StoreError(format!(
                "failed to serialize snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        atomic_write_file(path, &content)
    }

    fn check_version(&self, path: &Path, version: u32) -> Result<()> {
        if version != SNAPSHOT_VERSION {
            return Err(MusterError::StoreError(format!(
                "snapshot '{}' has unsupported version {} (expected {})",
                path.display(),
                version,
                SNAPSHOT_VERSION
            )));
        }
        Ok(())
    }
}

impl CoordinationStore for JsonStore {
    fn load_agents(&self) -> Result<Option<AgentsSnapshot>> {
        let path = self.agents_path();
        match self.load_snapshot::<AgentsSnapshot>(&path)? {
            Some(snapshot) => {
                self.check_version(&path, snapshot.version)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    fn save_agents(&self, snapshot: &AgentsSnapshot) -> Result<()> {
        self.save_snapshot(&self.agents_path(), snapshot)
    }

    fn load_tasks(&self) -> Result<Option<TasksSnapshot>> {
        let path = self.tasks_path();
        match self.load_snapshot::<TasksSnapshot>(&path)? {
            Some(snapshot) => {
                self.check_version(&path, snapshot.version)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    fn save_tasks(&self, snapshot: &TasksSnapshot) -> Result<()> {
        self.save_snapshot(&self.tasks_path(), snapshot)
    }
}
