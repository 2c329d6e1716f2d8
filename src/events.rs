//! Event logging subsystem for muster.
//!
//! This module implements append-only event logging to support audit and
//! recovery. Events are stored in NDJSON format (one JSON object per line)
//! in `{data_dir}/events/events.ndjson`.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: The action performed (register_agent, match, score, ...)
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `task`: Optional task id for task-specific events
//! - `details`: Freeform object with action-specific details

use crate::error::{MusterError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Agent registered (or profile replaced)
    RegisterAgent,
    /// Task created in the pending set
    CreateTask,
    /// Team formed for a task
    Match,
    /// Capability-sharing rounds ran
    Exchange,
    /// Task executed (successfully or not)
    Execute,
    /// Task scored and archived
    Score,
    /// Reliability recomputed across the registry
    RecomputeReliability,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EventAction::RegisterAgent => "register_agent",
            EventAction::CreateTask => "create_task",
            EventAction::Match => "match",
            EventAction::Exchange => "exchange",
            EventAction::Execute => "execute",
            EventAction::Score => "score",
            EventAction::RecomputeReliability => "recompute_reliability",
        };
        write!(f, "{}", label)
    }
}

/// An event record for the audit log.
///
/// Events are serialized as single-line JSON objects and appended to the
/// events.ndjson file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// Optional task id for task-specific events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action.
    ///
    /// The timestamp is set to the current time, and the actor is
    /// determined from the environment (USER@HOSTNAME).
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            task: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the task id for this event.
    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task = Some(task_id.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| MusterError::StoreError(format!("failed to serialize event: {}", e)))
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append-only NDJSON event log.
#[derive(Debug, Clone)]
pub struct EventLog {
    events_dir: PathBuf,
}

impl EventLog {
    /// Create an event log rooted at `{data_dir}/events/`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            events_dir: data_dir.as_ref().join("events"),
        }
    }

    /// Path to the events file.
    pub fn events_file_path(&self) -> PathBuf {
        self.events_dir.join("events.ndjson")
    }

    /// Append an event to the log.
    ///
    /// The file is created if it doesn't exist. Each append results in one
    /// line with a trailing newline, synced to disk for durability.
    pub fn append(&self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;

        if !self.events_dir.exists() {
            fs::create_dir_all(&self.events_dir).map_err(|e| {
                MusterError::StoreError(format!(
                    "failed to create events directory '{}': {}",
                    self.events_dir.display(),
                    e
                ))
            })?;
        }

        let events_file = self.events_file_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&events_file)
            .map_err(|e| {
                MusterError::StoreError(format!(
                    "failed to open events file '{}': {}",
                    events_file.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            MusterError::StoreError(format!(
                "failed to write event to '{}': {}",
                events_file.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            MusterError::StoreError(format!(
                "failed to sync events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn append_creates_file_and_writes_one_line() {
        let temp = TempDir::new().unwrap();
        let log = EventLog::new(temp.path());

        let event = Event::new(EventAction::RegisterAgent).with_details(json!({"id": "alpha"}));
        log.append(&event).unwrap();

        let content = fs::read_to_string(log.events_file_path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("register_agent"));
        assert!(content.contains("alpha"));
    }

    #[test]
    fn append_accumulates_lines() {
        let temp = TempDir::new().unwrap();
        let log = EventLog::new(temp.path());

        log.append(&Event::new(EventAction::CreateTask).with_task("TASK-001"))
            .unwrap();
        log.append(&Event::new(EventAction::Match).with_task("TASK-001"))
            .unwrap();
        log.append(&Event::new(EventAction::Score).with_task("TASK-001"))
            .unwrap();

        let content = fs::read_to_string(log.events_file_path()).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn events_are_valid_single_line_json() {
        let temp = TempDir::new().unwrap();
        let log = EventLog::new(temp.path());

        let event = Event::new(EventAction::Execute)
            .with_task("TASK-002")
            .with_details(json!({"success": true, "duration": 0.5}));
        log.append(&event).unwrap();

        let content = fs::read_to_string(log.events_file_path()).unwrap();
        let parsed: Event = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.action, EventAction::Execute);
        assert_eq!(parsed.task.as_deref(), Some("TASK-002"));
        assert_eq!(parsed.details["success"], true);
    }

    #[test]
    fn actor_string_has_user_and_host() {
        let actor = get_actor_string();
        assert!(actor.contains('@'));
    }

    #[test]
    fn action_display_matches_serde() {
        for action in [
            EventAction::RegisterAgent,
            EventAction::CreateTask,
            EventAction::Match,
            EventAction::Exchange,
            EventAction::Execute,
            EventAction::Score,
            EventAction::RecomputeReliability,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action));
        }
    }
}
