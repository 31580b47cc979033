//! In-memory state store: task arena, id resolution map, membership index.
//!
//! Tasks live in a flat arena keyed by id; which list a task belongs to is
//! a map lookup, and per-list trees are derived views built on demand.
//! Structural mutations are O(1) map operations instead of tree walks.
//!
//! The store itself is not thread-safe; the engine owns it behind a mutex
//! and every mutation happens while the lock is held, so no reader ever
//! observes a half-applied transaction. The id resolution map and the
//! membership index are updated in the same call for every operation that
//! changes list membership; they must never diverge.

use std::collections::{HashMap, HashSet};

use log::warn;

use super::tracker::{SyncRecord, SyncTracker};
use crate::hierarchy::{self, HierarchicalTask};
use crate::model::{Task, TaskList};

#[derive(Debug, Default)]
pub struct StateStore {
    lists: Vec<TaskList>,
    tasks: HashMap<String, Task>,
    /// Id resolution map: task id -> containing list id.
    task_lists: HashMap<String, String>,
    /// Per-list member ids in insertion order.
    members: HashMap<String, Vec<String>>,
    /// Per-task mutation sequence numbers.
    seqs: HashMap<String, u64>,
    pub(crate) tracker: SyncTracker,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    pub fn has_list(&self, list_id: &str) -> bool {
        self.lists.iter().any(|l| l.id == list_id)
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    /// Containing list of a task, per the id resolution map.
    pub fn resolve_list(&self, task_id: &str) -> Option<&str> {
        self.task_lists.get(task_id).map(String::as_str)
    }

    /// Insert a task into a list: arena, id map, and membership index in
    /// one step.
    pub fn insert_task(&mut self, list_id: &str, task: Task) {
        let id = task.id.clone();
        self.tasks.insert(id.clone(), task);
        self.task_lists.insert(id.clone(), list_id.to_string());
        let members = self.members.entry(list_id.to_string()).or_default();
        if !members.contains(&id) {
            members.push(id);
        }
    }

    /// Replace a task's fields in the arena; membership is untouched.
    pub fn put_task(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    /// Remove a task from the arena, id map, and membership index.
    pub fn remove_task(&mut self, task_id: &str) -> Option<Task> {
        let removed = self.tasks.remove(task_id)?;
        if let Some(list_id) = self.task_lists.remove(task_id) {
            if let Some(members) = self.members.get_mut(&list_id) {
                members.retain(|id| id != task_id);
            }
        }
        self.seqs.remove(task_id);
        Some(removed)
    }

    /// Move a task's membership to another list, keeping the id map and
    /// the membership index in lockstep.
    pub fn move_membership(&mut self, task_id: &str, to_list_id: &str) {
        if !self.tasks.contains_key(task_id) {
            return;
        }
        if let Some(old_list) = self.task_lists.get(task_id) {
            if let Some(members) = self.members.get_mut(old_list) {
                members.retain(|id| id != task_id);
            }
        }
        self.task_lists
            .insert(task_id.to_string(), to_list_id.to_string());
        let members = self.members.entry(to_list_id.to_string()).or_default();
        if !members.iter().any(|id| id == task_id) {
            members.push(task_id.to_string());
        }
    }

    /// Rename a task id everywhere (placeholder adoption after a create
    /// response lands).
    pub fn rekey_task(&mut self, old_id: &str, new_id: &str) {
        if old_id == new_id {
            return;
        }
        let Some(mut task) = self.tasks.remove(old_id) else {
            return;
        };
        task.id = new_id.to_string();
        self.tasks.insert(new_id.to_string(), task);

        if let Some(list_id) = self.task_lists.remove(old_id) {
            if let Some(members) = self.members.get_mut(&list_id) {
                for slot in members.iter_mut() {
                    if slot == old_id {
                        *slot = new_id.to_string();
                    }
                }
            }
            self.task_lists.insert(new_id.to_string(), list_id);
        }
        if let Some(seq) = self.seqs.remove(old_id) {
            self.seqs.insert(new_id.to_string(), seq);
        }
        // Children keep pointing at the old placeholder id otherwise.
        for other in self.tasks.values_mut() {
            if other.parent_id.as_deref() == Some(old_id) {
                other.parent_id = Some(new_id.to_string());
            }
        }
        self.tracker.rekey(old_id, new_id);
    }

    /// Current mutation sequence number of a task (0 before any mutation).
    pub fn seq_of(&self, task_id: &str) -> u64 {
        self.seqs.get(task_id).copied().unwrap_or(0)
    }

    /// Bump and return a task's mutation sequence number.
    pub fn bump_seq(&mut self, task_id: &str) -> u64 {
        let seq = self.seqs.entry(task_id.to_string()).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Tasks of a list in membership (insertion) order.
    pub fn tasks_in(&self, list_id: &str) -> Vec<Task> {
        self.members
            .get(list_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tasks.get(id).cloned())
            .collect()
    }

    /// Derived tree view of one list.
    pub fn tree_for_list(&self, list_id: &str) -> Vec<HierarchicalTask> {
        hierarchy::build_tree(&self.tasks_in(list_id))
    }

    /// Root-level siblings of a list as `(task id, position)`, sorted the
    /// way the tree sorts them.
    pub fn root_siblings(&self, list_id: &str) -> Vec<(String, String)> {
        let mut siblings: Vec<(String, String)> = self
            .tasks_in(list_id)
            .into_iter()
            .filter(|t| t.parent_id.is_none())
            .map(|t| (t.id, t.position))
            .collect();
        siblings.sort_by(|a, b| a.1.cmp(&b.1));
        siblings
    }

    /// Ordered candidate lists for a remote call that must find the task.
    ///
    /// When the task has an unsettled sync record, the optimistic target
    /// list and the last remotely-acknowledged list come first; otherwise
    /// the caller-supplied list. Every other known list is appended as a
    /// last resort.
    pub fn probe_candidates(&self, task_id: &str, caller_list_id: &str) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        {
            let mut push_unique = |id: &str| {
                if !id.is_empty() && !candidates.iter().any(|c| c == id) {
                    candidates.push(id.to_string());
                }
            };
            match self.tracker.record(task_id) {
                Some(record) => {
                    push_unique(&record.target_list_id);
                    push_unique(&record.original_list_id);
                }
                None => push_unique(caller_list_id),
            }
            for list in &self.lists {
                push_unique(&list.id);
            }
        }
        candidates
    }

    /// Replace all lists and tasks from a full remote refresh.
    ///
    /// Tasks with live sync records and local-only placeholders keep their
    /// optimistic state; the fetched copy of such a task is discarded
    /// until its outstanding operation settles.
    pub fn rebuild(&mut self, lists: Vec<TaskList>, fetched: Vec<(String, Vec<Task>)>) {
        let preserved: Vec<(String, Task)> = self
            .tasks
            .values()
            .filter(|t| t.is_local_only() || self.tracker.record(&t.id).is_some())
            .filter_map(|t| {
                self.task_lists
                    .get(&t.id)
                    .map(|list| (list.clone(), t.clone()))
            })
            .collect();
        let preserved_ids: HashSet<String> =
            preserved.iter().map(|(_, t)| t.id.clone()).collect();

        self.lists = lists;
        self.tasks.clear();
        self.task_lists.clear();
        self.members.clear();
        self.seqs.retain(|id, _| preserved_ids.contains(id));

        for (list_id, tasks) in fetched {
            for task in tasks {
                if !preserved_ids.contains(&task.id) {
                    self.insert_task(&list_id, task);
                }
            }
        }
        for (list_id, task) in preserved {
            if self.has_list(&list_id) {
                self.insert_task(&list_id, task);
            } else {
                warn!(
                    "dropping unsynced task {}: its list {} no longer exists remotely",
                    task.id, list_id
                );
                self.tracker.remove(&task.id);
            }
        }
    }

    /// Load a persisted snapshot: ordered {list, tasks} pairs plus the
    /// sync record map.
    pub fn load(
        &mut self,
        lists: Vec<TaskList>,
        tasks_by_list: Vec<(String, Vec<Task>)>,
        records: Vec<(String, SyncRecord)>,
    ) {
        self.lists = lists;
        self.tasks.clear();
        self.task_lists.clear();
        self.members.clear();
        self.seqs.clear();
        self.tracker = SyncTracker::new();
        for (list_id, tasks) in tasks_by_list {
            for task in tasks {
                self.insert_task(&list_id, task);
            }
        }
        for (task_id, record) in records {
            self.tracker.restore(task_id, record);
        }
    }

    /// Snapshot view for persistence: every list with its tasks in
    /// membership order.
    pub fn snapshot_tasks(&self) -> Vec<(TaskList, Vec<Task>)> {
        self.lists
            .iter()
            .map(|list| (list.clone(), self.tasks_in(&list.id)))
            .collect()
    }

    /// Snapshot view of the sync records.
    pub fn snapshot_records(&self) -> Vec<(String, SyncRecord)> {
        self.tracker
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }
}
