//! Remote adapter abstraction for task-list services.
//!
//! This module defines the interface the sync engine talks to, along with
//! the wire-level data types and error taxonomy. The engine never sees
//! HTTP; it sees this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::TaskStatus;

pub mod http;

pub use http::HttpAdapter;

/// Identifies one signed-in account on the remote service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Error taxonomy for remote operations.
///
/// `NotFoundInList` drives the engine's fallback list probing; `Rejected`
/// is surfaced immediately with no retry; `Network` is transient and left
/// for the caller to re-issue.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("task not found in list {list_id}")]
    NotFoundInList { list_id: String },

    #[error("rejected by remote service: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid data from remote service: {0}")]
    InvalidData(String),

    #[error("remote error: {0}")]
    Other(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFoundInList { .. })
    }
}

/// A task list as the remote service returns it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteList {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// A task as the remote service returns it.
///
/// `notes` is the raw field and may carry the metadata marker; decoding
/// happens in the engine, not here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default)]
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    /// Tombstone flag; deleted tasks are skipped on full refresh.
    #[serde(default)]
    pub deleted: bool,
}

/// Payload for creating a task remotely.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RemoteTaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
}

/// Partial update payload; `None` fields are left untouched remotely.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RemoteTaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<Option<String>>,
}

/// Adapter trait every remote task-list service implements.
///
/// Success and failure are typed; every method is keyed by account since a
/// desktop install mirrors several accounts at once.
#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    async fn get_lists(&self, account: &AccountId) -> Result<Vec<RemoteList>, RemoteError>;

    async fn get_tasks(
        &self,
        account: &AccountId,
        list_id: &str,
    ) -> Result<Vec<RemoteTask>, RemoteError>;

    /// Create a task. `Ok(None)` is the remote's recognized no-op response
    /// for a suppressed duplicate.
    async fn create_task(
        &self,
        account: &AccountId,
        list_id: &str,
        draft: &RemoteTaskDraft,
    ) -> Result<Option<RemoteTask>, RemoteError>;

    async fn update_task(
        &self,
        account: &AccountId,
        list_id: &str,
        task_id: &str,
        patch: &RemoteTaskPatch,
    ) -> Result<RemoteTask, RemoteError>;

    /// Move a task between lists and/or reposition it after `previous`
    /// (`None` means first among its siblings).
    async fn move_task(
        &self,
        account: &AccountId,
        task_id: &str,
        from_list_id: &str,
        to_list_id: &str,
        previous: Option<&str>,
    ) -> Result<RemoteTask, RemoteError>;

    async fn delete_task(
        &self,
        account: &AccountId,
        list_id: &str,
        task_id: &str,
    ) -> Result<(), RemoteError>;
}
