//! Reconciliation merge: folding a remote response into local state.
//!
//! The remote authority owns the scalar task fields; the application owns
//! the metadata fields it smuggles through the notes channel. A response
//! therefore merges with field-level precedence: scalars from the
//! response, metadata from whichever side actually has a value. A remote
//! response that omits a locally-set value must never erase it.

use crate::metadata::TaskExtras;
use crate::model::Task;
use crate::remote::RemoteTask;

/// Merge a remote response into the current local task.
///
/// Callers run this while holding the state lock so the merged task is
/// swapped in atomically; partial application is never observable.
pub fn merge_remote(local: &Task, response: &RemoteTask) -> Task {
    let mut merged = Task::from_remote(response);
    merged.extras = merge_extras(&local.extras, &merged.extras);
    merged
}

/// Locally-owned fields: the response wins only where it carries a
/// non-empty value.
pub fn merge_extras(local: &TaskExtras, response: &TaskExtras) -> TaskExtras {
    TaskExtras {
        labels: if response.labels.is_empty() {
            local.labels.clone()
        } else {
            response.labels.clone()
        },
        priority: if response.priority == Default::default() {
            local.priority
        } else {
            response.priority
        },
        subtasks: if response.subtasks.is_empty() {
            local.subtasks.clone()
        } else {
            response.subtasks.clone()
        },
        recurring: if response.recurring.is_default() {
            local.recurring.clone()
        } else {
            response.recurring.clone()
        },
    }
}
