//! End-to-end tests for the optimistic sync engine, driven through a
//! scripted in-memory remote adapter.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use tokio::sync::{Mutex, Notify};

use taskmirror::engine::tracker::SyncState;
use taskmirror::engine::{RefreshStatus, SyncEngine};
use taskmirror::metadata::{self, TaskExtras};
use taskmirror::model::{Priority, TaskDraft, TaskPatch, TaskStatus};
use taskmirror::remote::{
    AccountId, RemoteAdapter, RemoteError, RemoteList, RemoteTask, RemoteTaskDraft,
    RemoteTaskPatch,
};

const MOCK_UPDATED: &str = "2024-01-01T10:00:00.000Z";

#[derive(Default)]
struct MockState {
    lists: Vec<RemoteList>,
    tasks: HashMap<String, Vec<RemoteTask>>,
    next_id: u32,
    fail_create: Option<RemoteError>,
    fail_update: Option<RemoteError>,
    fail_move: Option<RemoteError>,
    fail_delete: Option<RemoteError>,
    suppress_next_create: bool,
    update_calls: Vec<(String, String)>,
}

/// In-memory stand-in for the remote service: a faithful little server
/// with injectable one-shot failures and response gates.
#[derive(Default)]
struct MockRemote {
    state: Mutex<MockState>,
    create_holds: Mutex<VecDeque<Arc<Notify>>>,
    update_holds: Mutex<VecDeque<Arc<Notify>>>,
    holding: AtomicUsize,
}

impl MockRemote {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn seed_list(&self, id: &str, title: &str) {
        let mut st = self.state.lock().await;
        st.lists.push(RemoteList {
            id: id.to_string(),
            title: title.to_string(),
        });
        st.tasks.entry(id.to_string()).or_default();
    }

    async fn seed_task(&self, list_id: &str, id: &str, title: &str, notes: Option<&str>, parent: Option<&str>) {
        let mut st = self.state.lock().await;
        let tasks = st.tasks.entry(list_id.to_string()).or_default();
        let position = format!("{:020}", (tasks.len() + 1) * 1000);
        tasks.push(RemoteTask {
            id: id.to_string(),
            title: title.to_string(),
            notes: notes.map(str::to_string),
            status: TaskStatus::NeedsAction,
            due: None,
            position,
            parent: parent.map(str::to_string),
            updated: Some(MOCK_UPDATED.to_string()),
            deleted: false,
        });
    }

    async fn set_remote_title(&self, list_id: &str, task_id: &str, title: &str) {
        let mut st = self.state.lock().await;
        if let Some(task) = st
            .tasks
            .get_mut(list_id)
            .and_then(|v| v.iter_mut().find(|t| t.id == task_id))
        {
            task.title = title.to_string();
        }
    }

    async fn fail_next_create(&self, err: RemoteError) {
        self.state.lock().await.fail_create = Some(err);
    }

    async fn fail_next_update(&self, err: RemoteError) {
        self.state.lock().await.fail_update = Some(err);
    }

    async fn fail_next_move(&self, err: RemoteError) {
        self.state.lock().await.fail_move = Some(err);
    }

    async fn fail_next_delete(&self, err: RemoteError) {
        self.state.lock().await.fail_delete = Some(err);
    }

    async fn suppress_next_create(&self) {
        self.state.lock().await.suppress_next_create = true;
    }

    /// Gate the next create call; it blocks until the returned handle is
    /// notified.
    async fn hold_next_create(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.create_holds.lock().await.push_back(gate.clone());
        gate
    }

    /// Gate the next update call.
    async fn hold_next_update(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.update_holds.lock().await.push_back(gate.clone());
        gate
    }

    async fn task_in(&self, list_id: &str, task_id: &str) -> Option<RemoteTask> {
        self.state
            .lock()
            .await
            .tasks
            .get(list_id)
            .and_then(|v| v.iter().find(|t| t.id == task_id))
            .cloned()
    }

    async fn update_calls(&self) -> Vec<(String, String)> {
        self.state.lock().await.update_calls.clone()
    }

    async fn wait_until_held(&self, n: usize) {
        for _ in 0..400 {
            if self.holding.load(Ordering::SeqCst) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("mock never reached {n} held calls");
    }

    async fn maybe_hold(&self, holds: &Mutex<VecDeque<Arc<Notify>>>) {
        let gate = holds.lock().await.pop_front();
        if let Some(gate) = gate {
            self.holding.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
            self.holding.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn numeric_position(task: &RemoteTask) -> u64 {
        task.position.parse().unwrap_or(0)
    }
}

#[async_trait]
impl RemoteAdapter for MockRemote {
    async fn get_lists(&self, _account: &AccountId) -> Result<Vec<RemoteList>, RemoteError> {
        Ok(self.state.lock().await.lists.clone())
    }

    async fn get_tasks(
        &self,
        _account: &AccountId,
        list_id: &str,
    ) -> Result<Vec<RemoteTask>, RemoteError> {
        Ok(self
            .state
            .lock()
            .await
            .tasks
            .get(list_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_task(
        &self,
        _account: &AccountId,
        list_id: &str,
        draft: &RemoteTaskDraft,
    ) -> Result<Option<RemoteTask>, RemoteError> {
        self.maybe_hold(&self.create_holds).await;

        let mut st = self.state.lock().await;
        if let Some(err) = st.fail_create.take() {
            return Err(err);
        }
        if st.suppress_next_create {
            st.suppress_next_create = false;
            return Ok(None);
        }
        if !st.lists.iter().any(|l| l.id == list_id) {
            return Err(RemoteError::NotFoundInList {
                list_id: list_id.to_string(),
            });
        }
        st.next_id += 1;
        let id = format!("r{}", st.next_id);
        let tasks = st.tasks.entry(list_id.to_string()).or_default();
        let task = RemoteTask {
            id,
            title: draft.title.clone(),
            notes: draft.notes.clone(),
            status: draft.status,
            due: draft.due.clone(),
            position: format!("{:020}", (tasks.len() + 1) * 1000),
            parent: None,
            updated: Some(MOCK_UPDATED.to_string()),
            deleted: false,
        };
        tasks.push(task.clone());
        Ok(Some(task))
    }

    async fn update_task(
        &self,
        _account: &AccountId,
        list_id: &str,
        task_id: &str,
        patch: &RemoteTaskPatch,
    ) -> Result<RemoteTask, RemoteError> {
        self.maybe_hold(&self.update_holds).await;

        let mut st = self.state.lock().await;
        st.update_calls
            .push((list_id.to_string(), task_id.to_string()));
        if let Some(err) = st.fail_update.take() {
            return Err(err);
        }
        let not_found = || RemoteError::NotFoundInList {
            list_id: list_id.to_string(),
        };
        let task = st
            .tasks
            .get_mut(list_id)
            .ok_or_else(not_found)?
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(not_found)?;

        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(notes) = &patch.notes {
            task.notes = Some(notes.clone());
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(due) = &patch.due {
            task.due = due.clone();
        }
        task.updated = Some(MOCK_UPDATED.to_string());
        Ok(task.clone())
    }

    async fn move_task(
        &self,
        _account: &AccountId,
        task_id: &str,
        from_list_id: &str,
        to_list_id: &str,
        previous: Option<&str>,
    ) -> Result<RemoteTask, RemoteError> {
        let mut st = self.state.lock().await;
        if let Some(err) = st.fail_move.take() {
            return Err(err);
        }
        let not_found = || RemoteError::NotFoundInList {
            list_id: from_list_id.to_string(),
        };
        let from_tasks = st.tasks.get_mut(from_list_id).ok_or_else(not_found)?;
        let index = from_tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(not_found)?;
        let mut task = from_tasks.remove(index);
        if from_list_id != to_list_id {
            task.parent = None;
        }
        task.updated = Some(MOCK_UPDATED.to_string());

        let to_tasks = st.tasks.entry(to_list_id.to_string()).or_default();
        let insert_at = match previous {
            None => 0,
            Some(prev) => to_tasks
                .iter()
                .position(|t| t.id == prev)
                .map(|i| i + 1)
                .unwrap_or(to_tasks.len()),
        };
        // The service assigns the moved task a position between its new
        // neighbors; the neighbors keep theirs.
        let prev_num = insert_at
            .checked_sub(1)
            .and_then(|i| to_tasks.get(i))
            .map(Self::numeric_position);
        let next_num = to_tasks.get(insert_at).map(Self::numeric_position);
        let new_num = match (prev_num, next_num) {
            (Some(p), Some(n)) => (p + n) / 2,
            (Some(p), None) => p + 1000,
            (None, Some(n)) => n / 2,
            (None, None) => 1000,
        };
        task.position = format!("{new_num:020}");
        to_tasks.insert(insert_at, task);
        Ok(to_tasks[insert_at].clone())
    }

    async fn delete_task(
        &self,
        _account: &AccountId,
        list_id: &str,
        task_id: &str,
    ) -> Result<(), RemoteError> {
        let mut st = self.state.lock().await;
        if let Some(err) = st.fail_delete.take() {
            return Err(err);
        }
        let not_found = || RemoteError::NotFoundInList {
            list_id: list_id.to_string(),
        };
        let tasks = st.tasks.get_mut(list_id).ok_or_else(not_found)?;
        let index = tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(not_found)?;
        tasks.remove(index);
        Ok(())
    }
}

async fn seeded_engine(mock: &Arc<MockRemote>) -> SyncEngine {
    mock.seed_list("L1", "Inbox").await;
    mock.seed_list("L2", "Work").await;

    let marked = metadata::encode(
        "milk, eggs",
        &TaskExtras {
            labels: vec!["groceries".to_string()],
            priority: Priority::High,
            ..Default::default()
        },
    );
    mock.seed_task("L1", "t1", "Shopping", Some(&marked), None).await;
    mock.seed_task("L1", "t2", "Cheese", None, Some("t1")).await;
    mock.seed_task("L2", "t3", "Quarterly report", None, None).await;

    let engine = SyncEngine::new(mock.clone(), AccountId::new("acct"));
    match engine.refresh().await.unwrap() {
        RefreshStatus::Success => {}
        other => panic!("refresh failed: {other:?}"),
    }
    engine
}

fn network_error() -> RemoteError {
    RemoteError::Network("connection reset".to_string())
}

#[tokio::test]
async fn test_refresh_builds_trees_and_id_map() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    let lists = engine.lists().await;
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[0].title, "Inbox");

    let tree = engine.tree_for_list("L1").await;
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].task.id, "t1");
    assert_eq!(tree[0].children.len(), 1);
    assert_eq!(tree[0].children[0].task.id, "t2");
    assert_eq!(tree[0].children[0].depth, 1);

    // Metadata was decoded out of the notes channel.
    assert_eq!(tree[0].task.notes, "milk, eggs");
    assert_eq!(tree[0].task.extras.labels, vec!["groceries"]);
    assert_eq!(tree[0].task.extras.priority, Priority::High);

    assert_eq!(engine.resolve_list("t1").await.as_deref(), Some("L1"));
    assert_eq!(engine.resolve_list("t3").await.as_deref(), Some("L2"));
    assert_eq!(engine.sync_state("t1").await, SyncState::Synced);
}

#[tokio::test]
async fn test_create_appears_immediately_then_adopts_remote_id() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    let gate = mock.hold_next_create().await;
    let spawned = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .create_task(
                    "L1",
                    TaskDraft {
                        title: "Buy milk".to_string(),
                        ..Default::default()
                    },
                )
                .await
        })
    };
    mock.wait_until_held(1).await;

    // The optimistic task is already in the tree under a placeholder id.
    let pending: Vec<_> = engine
        .tasks_in("L1")
        .await
        .into_iter()
        .filter(|t| t.is_local_only())
        .collect();
    assert_eq!(pending.len(), 1);
    let local_id = pending[0].id.clone();
    assert_eq!(pending[0].title, "Buy milk");
    assert_eq!(engine.sync_state(&local_id).await, SyncState::Pending);
    assert_eq!(engine.resolve_list(&local_id).await.as_deref(), Some("L1"));

    // Set labels and priority locally while the create is still in
    // flight. The remote call for this update fails (the placeholder id
    // is unknown remotely), which is fine; the values stick locally.
    let patch = TaskPatch {
        labels: Some(vec!["errands".to_string()]),
        priority: Some(Priority::Urgent),
        ..Default::default()
    };
    let _ = engine.update_task("L1", &local_id, patch).await;

    gate.notify_one();
    let created = spawned.await.unwrap().unwrap().expect("task should be created");

    // Remote identity comes from the response, interim local edits stay.
    assert!(created.id.starts_with('r'));
    assert!(engine.task(&local_id).await.is_none());
    let adopted = engine.task(&created.id).await.unwrap();
    assert_eq!(adopted.title, "Buy milk");
    assert_eq!(adopted.extras.labels, vec!["errands"]);
    assert_eq!(adopted.extras.priority, Priority::Urgent);
    assert_eq!(
        adopted.updated_at,
        DateTime::parse_from_rfc3339(MOCK_UPDATED).unwrap()
    );
    assert_eq!(engine.resolve_list(&created.id).await.as_deref(), Some("L1"));
}

#[tokio::test]
async fn test_create_offline_keeps_local_task_failed() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    mock.fail_next_create(network_error()).await;
    let result = engine
        .create_task(
            "L1",
            TaskDraft {
                title: "Offline task".to_string(),
                ..Default::default()
            },
        )
        .await;
    assert!(result.is_err());

    let pending: Vec<_> = engine
        .tasks_in("L1")
        .await
        .into_iter()
        .filter(|t| t.is_local_only())
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "Offline task");

    let record = engine.sync_record(&pending[0].id).await.unwrap();
    assert_eq!(record.state, SyncState::Failed);
    assert_eq!(record.retry_count, 1);
    assert!(record.last_error.is_some());
}

#[tokio::test]
async fn test_create_duplicate_suppressed_resolves_without_task() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    mock.suppress_next_create().await;
    let created = engine
        .create_task(
            "L1",
            TaskDraft {
                title: "Dup".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(created.is_none());

    // The optimistic placeholder was withdrawn.
    assert!(engine.tasks_in("L1").await.iter().all(|t| !t.is_local_only()));
}

#[tokio::test]
async fn test_update_failure_keeps_optimistic_values() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    mock.fail_next_update(network_error()).await;
    let patch = TaskPatch {
        title: Some("Shopping (edited)".to_string()),
        ..Default::default()
    };
    let result = engine.update_task("L1", "t1", patch).await;
    assert!(result.is_err());

    // No rollback: the optimistic edit stays visible.
    let task = engine.task("t1").await.unwrap();
    assert_eq!(task.title, "Shopping (edited)");

    let record = engine.sync_record("t1").await.unwrap();
    assert_eq!(record.state, SyncState::Failed);
    assert_eq!(record.retry_count, 1);
    assert_eq!(record.original_task.title, "Shopping");
}

#[tokio::test]
async fn test_update_success_clears_record() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    let patch = TaskPatch {
        title: Some("Shopping v2".to_string()),
        ..Default::default()
    };
    let updated = engine.update_task("L1", "t1", patch).await.unwrap();
    assert_eq!(updated.title, "Shopping v2");
    assert_eq!(engine.sync_state("t1").await, SyncState::Synced);

    let remote = mock.task_in("L1", "t1").await.unwrap();
    assert_eq!(remote.title, "Shopping v2");
}

#[tokio::test]
async fn test_toggle_failure_keeps_optimistic_status() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    mock.fail_next_update(network_error()).await;
    let result = engine.toggle_completion("L1", "t1").await;
    assert!(result.is_err());

    // Uniform failure policy: the toggle is not silently reverted, the
    // failure is surfaced through the sync record instead.
    let task = engine.task("t1").await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    let record = engine.sync_record("t1").await.unwrap();
    assert_eq!(record.state, SyncState::Failed);
    assert_eq!(record.retry_count, 1);
    assert_eq!(record.original_task.status, TaskStatus::NeedsAction);
}

#[tokio::test]
async fn test_toggle_round_trips() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    let toggled = engine.toggle_completion("L1", "t1").await.unwrap();
    assert_eq!(toggled.status, TaskStatus::Completed);
    assert_eq!(
        mock.task_in("L1", "t1").await.unwrap().status,
        TaskStatus::Completed
    );

    let back = engine.toggle_completion("L1", "t1").await.unwrap();
    assert_eq!(back.status, TaskStatus::NeedsAction);
    assert_eq!(engine.sync_state("t1").await, SyncState::Synced);
}

#[tokio::test]
async fn test_move_updates_map_and_trees() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    engine.move_task("t3", "L2", "L1", None).await.unwrap();

    assert_eq!(engine.resolve_list("t3").await.as_deref(), Some("L1"));
    assert!(engine.tree_for_list("L2").await.is_empty());
    let l1_ids: Vec<String> = engine
        .tasks_in("L1")
        .await
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert!(l1_ids.contains(&"t3".to_string()));

    assert!(mock.task_in("L1", "t3").await.is_some());
    assert!(mock.task_in("L2", "t3").await.is_none());
    assert_eq!(engine.sync_state("t3").await, SyncState::Synced);
}

#[tokio::test]
async fn test_move_failure_keeps_optimistic_placement() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    mock.fail_next_move(network_error()).await;
    let result = engine.move_task("t3", "L2", "L1", None).await;
    assert!(result.is_err());

    // The task stays where the user dropped it.
    assert_eq!(engine.resolve_list("t3").await.as_deref(), Some("L1"));
    let record = engine.sync_record("t3").await.unwrap();
    assert_eq!(record.state, SyncState::Failed);
    assert_eq!(record.original_list_id, "L2");
    assert_eq!(record.target_list_id, "L1");

    // The remote never heard about it.
    assert!(mock.task_in("L2", "t3").await.is_some());
}

#[tokio::test]
async fn test_update_with_stale_list_probes_candidates() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    // Caller believes the task is in L1; it has lived in L2 all along.
    let patch = TaskPatch {
        title: Some("Quarterly report v2".to_string()),
        ..Default::default()
    };
    let updated = engine.update_task("L1", "t3", patch).await.unwrap();
    assert_eq!(updated.title, "Quarterly report v2");

    let calls = mock.update_calls().await;
    assert_eq!(
        calls,
        vec![
            ("L1".to_string(), "t3".to_string()),
            ("L2".to_string(), "t3".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_update_after_failed_move_probes_original_list() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    mock.fail_next_move(network_error()).await;
    let _ = engine.move_task("t3", "L2", "L1", None).await;

    // Locally the task sits in L1, remotely it never left L2. The update
    // probes the optimistic target first, then the original list.
    let patch = TaskPatch {
        title: Some("still syncs".to_string()),
        ..Default::default()
    };
    let updated = engine.update_task("L1", "t3", patch).await.unwrap();
    assert_eq!(updated.title, "still syncs");

    let calls = mock.update_calls().await;
    assert_eq!(
        calls,
        vec![
            ("L1".to_string(), "t3".to_string()),
            ("L2".to_string(), "t3".to_string()),
        ]
    );
    assert_eq!(mock.task_in("L2", "t3").await.unwrap().title, "still syncs");
}

#[tokio::test]
async fn test_concurrent_updates_merge_both_fields() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    // First update held at the remote; its response will arrive after the
    // second update has fully completed.
    let gate = mock.hold_next_update().await;
    let first = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .update_task(
                    "L2",
                    "t3",
                    TaskPatch {
                        priority: Some(Priority::High),
                        ..Default::default()
                    },
                )
                .await
        })
    };
    mock.wait_until_held(1).await;

    engine
        .update_task(
            "L2",
            "t3",
            TaskPatch {
                labels: Some(vec!["x".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    gate.notify_one();
    first.await.unwrap().unwrap();

    // Both edits survive even though the responses arrived out of order.
    let task = engine.task("t3").await.unwrap();
    assert_eq!(task.extras.priority, Priority::High);
    assert_eq!(task.extras.labels, vec!["x"]);
    assert_eq!(engine.sync_state("t3").await, SyncState::Synced);
}

#[tokio::test]
async fn test_delete_removes_immediately_and_acknowledges() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    engine.delete_task("L2", "t3").await.unwrap();
    assert!(engine.task("t3").await.is_none());
    assert!(engine.resolve_list("t3").await.is_none());
    assert!(mock.task_in("L2", "t3").await.is_none());
    assert_eq!(engine.sync_state("t3").await, SyncState::Synced);
}

#[tokio::test]
async fn test_delete_already_gone_remotely_counts_as_success() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    // Remote lost the task (deleted from another device).
    {
        let mut st = mock.state.lock().await;
        st.tasks.get_mut("L2").unwrap().clear();
    }

    engine.delete_task("L2", "t3").await.unwrap();
    assert!(engine.task("t3").await.is_none());
    assert_eq!(engine.sync_state("t3").await, SyncState::Synced);
}

#[tokio::test]
async fn test_delete_failure_keeps_task_removed_with_failed_record() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    mock.fail_next_delete(network_error()).await;
    let result = engine.delete_task("L2", "t3").await;
    assert!(result.is_err());

    assert!(engine.task("t3").await.is_none());
    let record = engine.sync_record("t3").await.unwrap();
    assert_eq!(record.state, SyncState::Failed);
    assert_eq!(record.original_task.id, "t3");
}

#[tokio::test]
async fn test_reorder_repositions_siblings() {
    let mock = MockRemote::new();
    mock.seed_list("L1", "Inbox").await;
    mock.seed_task("L1", "a", "A", None, None).await;
    mock.seed_task("L1", "b", "B", None, None).await;
    mock.seed_task("L1", "c", "C", None, None).await;

    let engine = SyncEngine::new(mock.clone(), AccountId::new("acct"));
    engine.refresh().await.unwrap();

    engine.reorder_task("L1", "c", Some("a")).await.unwrap();

    let order: Vec<String> = engine
        .tree_for_list("L1")
        .await
        .into_iter()
        .map(|n| n.task.id)
        .collect();
    assert_eq!(order, vec!["a", "c", "b"]);
    assert_eq!(engine.sync_state("c").await, SyncState::Synced);

    // Remote sibling order matches after reconciliation.
    let remote_order: Vec<String> = mock.state.lock().await.tasks["L1"]
        .iter()
        .map(|t| t.id.clone())
        .collect();
    assert_eq!(remote_order, vec!["a", "c", "b"]);
}

#[tokio::test]
async fn test_refresh_preserves_unsynced_optimistic_edits() {
    let mock = MockRemote::new();
    let engine = seeded_engine(&mock).await;

    mock.fail_next_update(network_error()).await;
    let patch = TaskPatch {
        title: Some("Edited offline".to_string()),
        ..Default::default()
    };
    let _ = engine.update_task("L1", "t1", patch).await;

    // Remote changed independently in the meantime.
    mock.set_remote_title("L2", "t3", "Renamed remotely").await;

    engine.refresh().await.unwrap();

    // The failed optimistic edit survives the wholesale rebuild; synced
    // tasks adopt remote changes.
    assert_eq!(engine.task("t1").await.unwrap().title, "Edited offline");
    assert_eq!(engine.sync_state("t1").await, SyncState::Failed);
    assert_eq!(engine.task("t3").await.unwrap().title, "Renamed remotely");
}
