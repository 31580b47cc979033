//! Task mutations: the optimistic mutation executor.
//!
//! Every operation follows the same shape: a synchronous section applies
//! the change to the arena, the id resolution map, and the sync tracker
//! while holding the state lock, then the lock is released and the remote
//! call runs. The response is reconciled against fresh state, because by the time
//! it lands, the task may have been edited, moved, or deleted again.
//!
//! Failure policy is uniform: the optimistic local state is kept, the
//! task's sync record goes to failed, and the error is surfaced so the
//! caller can decide what to do. Nothing here rolls back silently.

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use super::merge;
use super::state::StateStore;
use super::SyncEngine;
use crate::constants::LOCAL_ID_PREFIX;
use crate::metadata::{self, TaskExtras};
use crate::model::{Task, TaskDraft, TaskPatch, TaskStatus};
use crate::remote::{RemoteError, RemoteTask, RemoteTaskDraft, RemoteTaskPatch};
use crate::utils::{datetime, position};

/// Correlation data a mutation carries into its async section.
struct OpTicket {
    operation_id: Uuid,
    seq: u64,
}

impl SyncEngine {
    /// Creates a task in a list, locally first.
    ///
    /// The task appears in the tree immediately under a generated
    /// placeholder id; the remote id is adopted when the create response
    /// lands. Resolves with `None` when the remote suppresses the create
    /// as a duplicate, in which case the placeholder is withdrawn.
    pub async fn create_task(&self, list_id: &str, draft: TaskDraft) -> Result<Option<Task>> {
        let (local_id, remote_draft, ticket) = {
            let mut store = self.state.lock().await;
            if !store.has_list(list_id) {
                return Err(anyhow!("unknown list: {list_id}"));
            }
            let local_id = format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4());
            let last_position = store
                .root_siblings(list_id)
                .last()
                .map(|(_, pos)| pos.clone());
            let task = Task {
                id: local_id.clone(),
                parent_id: draft.parent_id.clone(),
                title: draft.title.clone(),
                notes: draft.notes.clone(),
                due: draft.due,
                status: TaskStatus::NeedsAction,
                position: position::between(last_position.as_deref(), None),
                updated_at: Utc::now(),
                extras: draft.extras.clone(),
            };
            store.insert_task(list_id, task.clone());
            let seq = store.bump_seq(&local_id);
            let operation_id = store
                .tracker
                .begin(&local_id, list_id, list_id, task, seq);
            info!("task {local_id} created locally in list {list_id}");

            let remote_draft = RemoteTaskDraft {
                title: draft.title.clone(),
                notes: encoded_notes(&draft.notes, &draft.extras),
                status: TaskStatus::NeedsAction,
                due: draft.due.map(datetime::format_wire_due),
            };
            (local_id, remote_draft, OpTicket { operation_id, seq })
        };

        match self
            .remote
            .create_task(&self.account, list_id, &remote_draft)
            .await
        {
            Ok(Some(response)) => {
                let mut store = self.state.lock().await;
                store.rekey_task(&local_id, &response.id);
                // Birth reconciliation always merges: the id and remote
                // timestamps come from the response, while the extras
                // precedence keeps edits made while the call was in flight.
                let adopted = store.task(&response.id).cloned().map(|local| {
                    let merged = merge::merge_remote(&local, &response);
                    store.put_task(merged.clone());
                    merged
                });
                store.tracker.resolve(&response.id, ticket.operation_id);
                info!("task {local_id} adopted remote id {}", response.id);
                Ok(adopted)
            }
            Ok(None) => {
                let mut store = self.state.lock().await;
                store.remove_task(&local_id);
                store.tracker.remove(&local_id);
                info!("remote suppressed create of {local_id} as duplicate, placeholder withdrawn");
                Ok(None)
            }
            Err(e) => {
                self.mark_failed(&local_id, &ticket, &e).await;
                Err(e.into())
            }
        }
    }

    /// Updates a task's fields, locally first.
    ///
    /// The remote call probes candidate lists in order, because the task
    /// may have been optimistically moved since the remote last saw it:
    /// the sync record's target and original lists when one exists,
    /// otherwise the caller-supplied list, then every other known list as
    /// a last resort.
    pub async fn update_task(&self, list_id: &str, task_id: &str, patch: TaskPatch) -> Result<Task> {
        let (candidates, remote_patch, ticket) = {
            let mut store = self.state.lock().await;
            let Some(existing) = store.task(task_id).cloned() else {
                return Err(anyhow!("task not found: {task_id}"));
            };
            // Candidate order is decided by the record as it stood before
            // this mutation touches it.
            let candidates = store.probe_candidates(task_id, list_id);
            let current_list = store
                .resolve_list(task_id)
                .unwrap_or(list_id)
                .to_string();

            let mut updated = existing.clone();
            patch.apply_to(&mut updated);
            store.put_task(updated.clone());
            let seq = store.bump_seq(task_id);
            let operation_id =
                store
                    .tracker
                    .begin(task_id, &current_list, &current_list, existing, seq);
            debug!("task {task_id} updated locally (seq {seq})");

            (
                candidates,
                build_remote_patch(&updated, &patch),
                OpTicket { operation_id, seq },
            )
        };

        match self.probe_update(&candidates, task_id, &remote_patch).await {
            Ok(response) => self.reconcile_success(task_id, &ticket, &response).await,
            Err(e) => {
                self.mark_failed(task_id, &ticket, &e).await;
                Err(e.into())
            }
        }
    }

    /// Flips a task between needs-action and completed.
    ///
    /// Routed through [`SyncEngine::update_task`] so fallback probing and
    /// the uniform failure policy apply: a failed toggle keeps the
    /// optimistic status and surfaces the error.
    pub async fn toggle_completion(&self, list_id: &str, task_id: &str) -> Result<Task> {
        let next = {
            let store = self.state.lock().await;
            let Some(task) = store.task(task_id) else {
                return Err(anyhow!("task not found: {task_id}"));
            };
            task.status.toggled()
        };
        let patch = TaskPatch {
            status: Some(next),
            ..Default::default()
        };
        self.update_task(list_id, task_id, patch).await
    }

    /// Moves a task to another list (or repositions it after `previous`
    /// when the lists are the same), locally first.
    ///
    /// On failure the task stays where the user dropped it and the sync
    /// record goes to failed; re-issuing the move retries from there.
    pub async fn move_task(
        &self,
        task_id: &str,
        from_list_id: &str,
        to_list_id: &str,
        previous: Option<&str>,
    ) -> Result<Task> {
        let (remote_from, ticket) = {
            let mut store = self.state.lock().await;
            let Some(existing) = store.task(task_id).cloned() else {
                return Err(anyhow!("task not found: {task_id}"));
            };
            if !store.has_list(to_list_id) {
                return Err(anyhow!("unknown list: {to_list_id}"));
            }
            // The remote still holds the task in the last list it
            // acknowledged, not necessarily where the caller sees it.
            let remote_from = store
                .tracker
                .record(task_id)
                .map(|r| r.original_list_id.clone())
                .unwrap_or_else(|| from_list_id.to_string());

            store.move_membership(task_id, to_list_id);
            let mut moved = existing.clone();
            if from_list_id != to_list_id {
                // A cross-list move arrives at the destination as a root.
                moved.parent_id = None;
            }
            moved.position = position_after(&store, to_list_id, task_id, previous);
            moved.updated_at = Utc::now();
            store.put_task(moved);
            let seq = store.bump_seq(task_id);
            let operation_id = store
                .tracker
                .begin(task_id, &remote_from, to_list_id, existing, seq);
            info!("task {task_id} moved locally {from_list_id} -> {to_list_id}");
            (remote_from, OpTicket { operation_id, seq })
        };

        match self
            .remote
            .move_task(&self.account, task_id, &remote_from, to_list_id, previous)
            .await
        {
            Ok(response) => self.reconcile_success(task_id, &ticket, &response).await,
            Err(e) => {
                self.mark_failed(task_id, &ticket, &e).await;
                Err(e.into())
            }
        }
    }

    /// Repositions a task among its siblings within a list.
    pub async fn reorder_task(
        &self,
        list_id: &str,
        task_id: &str,
        previous: Option<&str>,
    ) -> Result<Task> {
        self.move_task(task_id, list_id, list_id, previous).await
    }

    /// Deletes a task, locally first.
    ///
    /// The task and its metadata leave local state immediately; the
    /// record settles when the remote acknowledges. A remote not-found
    /// counts as success; deletes are idempotent under at-least-once
    /// delivery.
    pub async fn delete_task(&self, list_id: &str, task_id: &str) -> Result<()> {
        let (remote_list, ticket) = {
            let mut store = self.state.lock().await;
            let Some(existing) = store.task(task_id).cloned() else {
                return Err(anyhow!("task not found: {task_id}"));
            };
            let current_list = store
                .resolve_list(task_id)
                .unwrap_or(list_id)
                .to_string();
            let remote_list = store
                .tracker
                .record(task_id)
                .map(|r| r.original_list_id.clone())
                .unwrap_or_else(|| current_list.clone());
            let seq = store.seq_of(task_id);
            store.remove_task(task_id);
            let operation_id =
                store
                    .tracker
                    .begin(task_id, &remote_list, &current_list, existing, seq);
            info!("task {task_id} removed locally from list {current_list}");
            (remote_list, OpTicket { operation_id, seq })
        };

        // A placeholder that never synced has nothing to delete remotely.
        if task_id.starts_with(LOCAL_ID_PREFIX) {
            let mut store = self.state.lock().await;
            store.tracker.resolve(task_id, ticket.operation_id);
            return Ok(());
        }

        match self
            .remote
            .delete_task(&self.account, &remote_list, task_id)
            .await
        {
            Ok(()) => {
                let mut store = self.state.lock().await;
                store.tracker.resolve(task_id, ticket.operation_id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("task {task_id} already gone remotely, treating delete as acknowledged");
                let mut store = self.state.lock().await;
                store.tracker.resolve(task_id, ticket.operation_id);
                Ok(())
            }
            Err(e) => {
                self.mark_failed(task_id, &ticket, &e).await;
                Err(e.into())
            }
        }
    }

    /// Try the remote update against candidate lists in order. Not-found
    /// advances to the next candidate; any other error aborts.
    async fn probe_update(
        &self,
        candidates: &[String],
        task_id: &str,
        patch: &RemoteTaskPatch,
    ) -> Result<RemoteTask, RemoteError> {
        let mut last_not_found: Option<RemoteError> = None;
        for list_id in candidates {
            match self
                .remote
                .update_task(&self.account, list_id, task_id, patch)
                .await
            {
                Ok(task) => {
                    if last_not_found.is_some() {
                        debug!("fallback probing found task {task_id} in list {list_id}");
                    }
                    return Ok(task);
                }
                Err(e) if e.is_not_found() => {
                    debug!("task {task_id} not in list {list_id}, probing next candidate");
                    last_not_found = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_not_found
            .unwrap_or_else(|| RemoteError::Other(format!("no candidate lists for task {task_id}"))))
    }

    /// Fold a successful response into fresh local state and settle the
    /// sync record if this operation still owns it.
    async fn reconcile_success(
        &self,
        task_id: &str,
        ticket: &OpTicket,
        response: &RemoteTask,
    ) -> Result<Task> {
        let mut store = self.state.lock().await;
        store.tracker.resolve(task_id, ticket.operation_id);

        let Some(local) = store.task(task_id) else {
            warn!("response for task {task_id} arrived after local removal");
            return Err(anyhow!(
                "task {task_id} was removed locally while its operation was in flight"
            ));
        };

        let current_seq = store.seq_of(task_id);
        if current_seq > ticket.seq {
            // A newer local mutation superseded this response; its own
            // round trip carries the fresher remote-owned fields.
            info!(
                "stale response for task {task_id} skipped (op seq {} < current {current_seq})",
                ticket.seq
            );
            return Ok(local.clone());
        }

        let merged = merge::merge_remote(local, response);
        store.put_task(merged.clone());
        Ok(merged)
    }

    /// Record a remote failure; local optimistic state is left as-is.
    async fn mark_failed(&self, task_id: &str, ticket: &OpTicket, error: &RemoteError) {
        let mut store = self.state.lock().await;
        if store.tracker.fail(task_id, ticket.operation_id, &error.to_string()) {
            warn!("remote operation failed for task {task_id}: {error}");
        } else {
            debug!("failure of superseded operation on task {task_id} ignored: {error}");
        }
    }
}

fn encoded_notes(notes: &str, extras: &TaskExtras) -> Option<String> {
    if notes.is_empty() && extras.is_empty() {
        None
    } else {
        Some(metadata::encode(notes, extras))
    }
}

/// Translate an applied local patch into the wire-level partial update.
/// Touching notes or any metadata field re-encodes the whole notes
/// channel from the updated task.
fn build_remote_patch(updated: &Task, patch: &TaskPatch) -> RemoteTaskPatch {
    let touches_extras = patch.labels.is_some()
        || patch.priority.is_some()
        || patch.subtasks.is_some()
        || patch.recurring.is_some();
    RemoteTaskPatch {
        title: patch.title.clone(),
        notes: if patch.notes.is_some() || touches_extras {
            Some(metadata::encode(&updated.notes, &updated.extras))
        } else {
            None
        },
        status: patch.status,
        due: patch
            .due
            .map(|due| due.map(datetime::format_wire_due)),
    }
}

/// Position string for a task landing after `previous` among the root
/// siblings of a list (`None` means first).
fn position_after(
    store: &StateStore,
    list_id: &str,
    task_id: &str,
    previous: Option<&str>,
) -> String {
    let siblings: Vec<(String, String)> = store
        .root_siblings(list_id)
        .into_iter()
        .filter(|(id, _)| id != task_id)
        .collect();
    match previous {
        None => position::between(None, siblings.first().map(|(_, p)| p.as_str())),
        Some(prev_id) => match siblings.iter().position(|(id, _)| id == prev_id) {
            Some(i) => position::between(
                Some(siblings[i].1.as_str()),
                siblings.get(i + 1).map(|(_, p)| p.as_str()),
            ),
            None => position::between(siblings.last().map(|(_, p)| p.as_str()), None),
        },
    }
}
