//! Per-task sync state tracking.
//!
//! Every task with an outstanding or previously-failed remote operation
//! has a [`SyncRecord`]; absence of a record means the task is in sync
//! with the remote authority. Records carry everything a retry or a
//! caller-driven rollback needs: the pre-mutation snapshot, the lists
//! involved, the attempt count, and the correlation id of the operation
//! that currently owns the record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Task;

/// Sync status of a single task relative to the remote authority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Synced,
    Pending,
    Failed,
}

/// Bookkeeping for one task's outstanding or failed remote operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncRecord {
    pub state: SyncState,
    /// Last list the remote authority is known to have held the task in.
    pub original_list_id: String,
    /// List the task lives in locally after the optimistic mutation.
    pub target_list_id: String,
    pub retry_count: u32,
    pub last_error: Option<String>,
    /// Correlation token of the operation that owns this record. A newer
    /// mutation takes ownership; responses from superseded operations must
    /// not transition the record.
    pub operation_id: Uuid,
    /// Full pre-mutation snapshot, kept for caller-driven rollback.
    pub original_task: Task,
    /// Mutation sequence number captured when the operation started.
    pub seq: u64,
}

/// Map of task id to sync record.
#[derive(Debug, Default)]
pub struct SyncTracker {
    records: HashMap<String, SyncRecord>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sync state of a task; no record means synced.
    pub fn state_of(&self, task_id: &str) -> SyncState {
        self.records
            .get(task_id)
            .map(|r| r.state)
            .unwrap_or(SyncState::Synced)
    }

    pub fn record(&self, task_id: &str) -> Option<&SyncRecord> {
        self.records.get(task_id)
    }

    /// Start a mutation: transition to pending and hand out a fresh
    /// operation id.
    ///
    /// If the task already has an unsynced record, `original_list_id` (the
    /// last list the remote is known to hold the task in) and the attempt
    /// count carry over; snapshot, target list, and operation id are
    /// refreshed.
    pub fn begin(
        &mut self,
        task_id: &str,
        original_list_id: &str,
        target_list_id: &str,
        snapshot: Task,
        seq: u64,
    ) -> Uuid {
        let operation_id = Uuid::new_v4();
        match self.records.get_mut(task_id) {
            Some(existing) => {
                existing.state = SyncState::Pending;
                existing.target_list_id = target_list_id.to_string();
                existing.operation_id = operation_id;
                existing.original_task = snapshot;
                existing.seq = seq;
                existing.last_error = None;
            }
            None => {
                self.records.insert(
                    task_id.to_string(),
                    SyncRecord {
                        state: SyncState::Pending,
                        original_list_id: original_list_id.to_string(),
                        target_list_id: target_list_id.to_string(),
                        retry_count: 0,
                        last_error: None,
                        operation_id,
                        original_task: snapshot,
                        seq,
                    },
                );
            }
        }
        operation_id
    }

    /// Settle a record after remote success. Only the operation that owns
    /// the record may clear it; a superseded response leaves the newer
    /// operation's record alone.
    pub fn resolve(&mut self, task_id: &str, operation_id: Uuid) -> bool {
        match self.records.get(task_id) {
            Some(record) if record.operation_id == operation_id => {
                self.records.remove(task_id);
                true
            }
            _ => false,
        }
    }

    /// Record a remote failure for the owning operation.
    pub fn fail(&mut self, task_id: &str, operation_id: Uuid, error: &str) -> bool {
        match self.records.get_mut(task_id) {
            Some(record) if record.operation_id == operation_id => {
                record.state = SyncState::Failed;
                record.retry_count += 1;
                record.last_error = Some(error.to_string());
                true
            }
            _ => false,
        }
    }

    /// Move a record to a new task id (placeholder id adoption).
    pub fn rekey(&mut self, old_id: &str, new_id: &str) {
        if old_id == new_id {
            return;
        }
        if let Some(record) = self.records.remove(old_id) {
            self.records.insert(new_id.to_string(), record);
        }
    }

    pub fn remove(&mut self, task_id: &str) {
        self.records.remove(task_id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SyncRecord)> {
        self.records.iter()
    }

    pub fn restore(&mut self, task_id: String, record: SyncRecord) {
        self.records.insert(task_id, record);
    }
}
