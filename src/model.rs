//! Domain model for mirrored tasks.
//!
//! These are the application-side task types: what the remote service
//! knows about (title, notes, due, status, position, parent) plus the
//! application-private fields that only survive a remote round trip via
//! the metadata codec.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::metadata::{self, TaskExtras};
use crate::remote::RemoteTask;
use crate::utils::datetime;

/// Completion status as the remote service models it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    #[default]
    NeedsAction,
    Completed,
}

impl TaskStatus {
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::NeedsAction => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::NeedsAction,
        }
    }
}

/// Application-private task priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A lightweight checklist entry stored inside the task metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
    Yearly,
}

/// Recurrence rule stored inside the task metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Recurrence {
    pub fn is_default(&self) -> bool {
        *self == Recurrence::default()
    }
}

/// A task list as the remote service models it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub title: String,
}

/// A single task in local state.
///
/// `id` is the remote id once the task has synced at least once, or a
/// locally generated `local-<uuid>` placeholder before that. Which list
/// the task belongs to is tracked by the engine's id resolution map, not
/// on the task itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub title: String,
    /// User-visible notes, metadata marker already stripped.
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub position: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub extras: TaskExtras,
}

impl Task {
    /// Whether this task still carries a locally generated placeholder id.
    pub fn is_local_only(&self) -> bool {
        self.id.starts_with(crate::constants::LOCAL_ID_PREFIX)
    }

    /// Build a local task from a remote response, decoding the metadata
    /// marker out of the notes field.
    pub fn from_remote(remote: &RemoteTask) -> Self {
        let decoded = metadata::decode(remote.notes.as_deref().unwrap_or(""));
        Task {
            id: remote.id.clone(),
            parent_id: remote.parent.clone(),
            title: remote.title.clone(),
            notes: decoded.clean_notes,
            due: remote.due.as_deref().and_then(datetime::parse_wire_due),
            status: remote.status,
            position: remote.position.clone(),
            updated_at: datetime::parse_wire_updated(remote.updated.as_deref()),
            extras: decoded.extras,
        }
    }
}

/// Arguments for creating a new task.
#[derive(Clone, Debug, Default)]
pub struct TaskDraft {
    pub title: String,
    pub notes: String,
    pub due: Option<NaiveDate>,
    pub parent_id: Option<String>,
    pub extras: TaskExtras,
}

/// Arguments for updating a task. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due: Option<Option<NaiveDate>>,
    pub status: Option<TaskStatus>,
    pub labels: Option<Vec<String>>,
    pub priority: Option<Priority>,
    pub subtasks: Option<Vec<Subtask>>,
    pub recurring: Option<Recurrence>,
}

impl TaskPatch {
    /// Apply this patch to a task in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
        if let Some(due) = &self.due {
            task.due = *due;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(labels) = &self.labels {
            task.extras.labels = labels.clone();
        }
        if let Some(priority) = self.priority {
            task.extras.priority = priority;
        }
        if let Some(subtasks) = &self.subtasks {
            task.extras.subtasks = subtasks.clone();
        }
        if let Some(recurring) = &self.recurring {
            task.extras.recurring = recurring.clone();
        }
        task.updated_at = Utc::now();
    }
}
