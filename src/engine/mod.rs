//! Optimistic synchronization engine.
//!
//! This module provides the [`SyncEngine`] struct which keeps the local
//! task mirror and the remote task service in agreement. Local mutations
//! (create, edit, move, reorder, complete, delete) apply synchronously to
//! in-memory state and return before any network call resolves; the
//! remote call runs afterwards and its response is folded back through
//! the reconciliation merge without erasing newer local edits.
//!
//! The engine acts as the main data layer for the application, offering:
//! - Zero-latency local mutations with per-task sync bookkeeping
//! - Background full refreshes from the remote service
//! - Fallback list probing for tasks that moved before the remote knew
//! - Snapshot load/save against local storage for offline startup

pub mod merge;
pub mod state;
pub mod tasks;
pub mod tracker;

use std::sync::Arc;

use anyhow::Result;
use log::{error, info};
use tokio::sync::Mutex;

use crate::hierarchy::HierarchicalTask;
use crate::model::{Task, TaskList};
use crate::remote::{AccountId, RemoteAdapter};
use crate::storage::{snapshot, LocalStorage};
use state::StateStore;
use tracker::{SyncRecord, SyncState};

/// Result of a full refresh from the remote service.
#[derive(Debug, Clone)]
pub enum RefreshStatus {
    /// Another refresh was already running; nothing was done.
    InProgress,
    /// The refresh completed and local state was rebuilt.
    Success,
    /// The refresh failed before local state was touched.
    Error {
        /// Human-readable error message describing what went wrong
        message: String,
    },
}

/// Engine that mirrors a remote account's task collection locally.
///
/// All state lives behind one mutex: every mutation holds the lock for
/// its whole synchronous section, so readers never observe a
/// half-applied transaction. Remote calls happen with the lock released
/// and re-acquire it to reconcile, always against fresh state; async
/// sections never close over stale snapshots.
#[derive(Clone)]
pub struct SyncEngine {
    remote: Arc<dyn RemoteAdapter>,
    account: AccountId,
    state: Arc<Mutex<StateStore>>,
    refresh_in_progress: Arc<Mutex<bool>>,
}

impl SyncEngine {
    /// Creates a new engine for one remote account.
    pub fn new(remote: Arc<dyn RemoteAdapter>, account: AccountId) -> Self {
        Self {
            remote,
            account,
            state: Arc::new(Mutex::new(StateStore::new())),
            refresh_in_progress: Arc::new(Mutex::new(false)),
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Checks if a full refresh is currently in progress.
    pub async fn is_refreshing(&self) -> bool {
        *self.refresh_in_progress.lock().await
    }

    /// Performs a full refresh from the remote service.
    ///
    /// Fetches every list and its tasks, decodes the metadata channel,
    /// and rebuilds the arena, the id resolution map, and the derived
    /// trees wholesale. Tasks with unsettled optimistic operations keep
    /// their local state. Only one refresh runs at a time.
    pub async fn refresh(&self) -> Result<RefreshStatus> {
        {
            let mut guard = self.refresh_in_progress.lock().await;
            if *guard {
                return Ok(RefreshStatus::InProgress);
            }
            *guard = true;
        }

        let result = self.perform_refresh().await;

        {
            let mut guard = self.refresh_in_progress.lock().await;
            *guard = false;
        }

        result
    }

    async fn perform_refresh(&self) -> Result<RefreshStatus> {
        info!("🔄 Starting refresh for account {}", self.account);

        let remote_lists = match self.remote.get_lists(&self.account).await {
            Ok(lists) => {
                info!("✅ Fetched {} lists from remote", lists.len());
                lists
            }
            Err(e) => {
                error!("❌ Failed to fetch lists: {e}");
                return Ok(RefreshStatus::Error {
                    message: format!("Failed to fetch lists: {e}"),
                });
            }
        };

        let mut lists = Vec::with_capacity(remote_lists.len());
        let mut fetched = Vec::with_capacity(remote_lists.len());
        for remote_list in remote_lists {
            let remote_tasks = match self.remote.get_tasks(&self.account, &remote_list.id).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    error!("❌ Failed to fetch tasks for list {}: {e}", remote_list.id);
                    return Ok(RefreshStatus::Error {
                        message: format!("Failed to fetch tasks for list {}: {e}", remote_list.id),
                    });
                }
            };
            let tasks: Vec<Task> = remote_tasks
                .iter()
                .filter(|t| !t.deleted)
                .map(Task::from_remote)
                .collect();
            info!("✅ Fetched {} tasks for list {}", tasks.len(), remote_list.id);

            lists.push(TaskList {
                id: remote_list.id.clone(),
                title: remote_list.title.clone(),
            });
            fetched.push((remote_list.id, tasks));
        }

        let mut store = self.state.lock().await;
        store.rebuild(lists, fetched);
        info!("✅ Local state rebuilt from refresh");

        Ok(RefreshStatus::Success)
    }

    /// All known task lists.
    pub async fn lists(&self) -> Vec<TaskList> {
        self.state.lock().await.lists().to_vec()
    }

    /// Derived tree view of one list, sorted for display.
    pub async fn tree_for_list(&self, list_id: &str) -> Vec<HierarchicalTask> {
        self.state.lock().await.tree_for_list(list_id)
    }

    /// Flat tasks of one list in membership order.
    pub async fn tasks_in(&self, list_id: &str) -> Vec<Task> {
        self.state.lock().await.tasks_in(list_id)
    }

    /// A single task by id.
    pub async fn task(&self, task_id: &str) -> Option<Task> {
        self.state.lock().await.task(task_id).cloned()
    }

    /// Containing list of a task per the id resolution map.
    pub async fn resolve_list(&self, task_id: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .resolve_list(task_id)
            .map(str::to_string)
    }

    /// Sync state of a task; absence of bookkeeping means synced.
    pub async fn sync_state(&self, task_id: &str) -> SyncState {
        self.state.lock().await.tracker.state_of(task_id)
    }

    /// Full sync record of a task, if it has an unsettled operation.
    pub async fn sync_record(&self, task_id: &str) -> Option<SyncRecord> {
        self.state.lock().await.tracker.record(task_id).cloned()
    }

    /// Load the persisted snapshot into the engine (startup path).
    pub async fn load_snapshot(&self, storage: &LocalStorage) -> Result<()> {
        let (lists, tasks_by_list, records) = snapshot::load(&storage.conn).await?;
        let mut store = self.state.lock().await;
        store.load(lists, tasks_by_list, records);
        Ok(())
    }

    /// Persist the current state as the local snapshot.
    pub async fn save_snapshot(&self, storage: &LocalStorage) -> Result<()> {
        let (tasks_by_list, records) = {
            let store = self.state.lock().await;
            (store.snapshot_tasks(), store.snapshot_records())
        };
        snapshot::save(&storage.conn, &tasks_by_list, &records).await
    }
}
