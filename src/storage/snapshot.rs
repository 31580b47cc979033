//! Snapshot persistence: converting engine state to and from rows.
//!
//! The snapshot is written wholesale inside one transaction (clear, then
//! insert), mirroring how the engine rebuilds its arena wholesale on a
//! full refresh.

use anyhow::{Context, Result};
use sea_orm::ActiveValue::Set;
use sea_orm::{DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use crate::engine::tracker::{SyncRecord, SyncState};
use crate::entities::{list, sync_record, task};
use crate::metadata::TaskExtras;
use crate::model::{Task, TaskList, TaskStatus};
use crate::repositories::{ListRepository, SyncRecordRepository, TaskRepository};
use crate::utils::datetime;

/// Persist the full snapshot, replacing whatever was stored before.
pub async fn save(
    conn: &DatabaseConnection,
    tasks_by_list: &[(TaskList, Vec<Task>)],
    records: &[(String, SyncRecord)],
) -> Result<()> {
    let txn = conn.begin().await?;

    SyncRecordRepository::clear(&txn).await?;
    TaskRepository::clear(&txn).await?;
    ListRepository::clear(&txn).await?;

    let mut list_models = Vec::with_capacity(tasks_by_list.len());
    let mut task_models = Vec::new();
    for (list_index, (task_list, tasks)) in tasks_by_list.iter().enumerate() {
        list_models.push(list::ActiveModel {
            id: Set(task_list.id.clone()),
            title: Set(task_list.title.clone()),
            sort_index: Set(list_index as i32),
        });
        for (task_index, t) in tasks.iter().enumerate() {
            task_models.push(task_to_model(&task_list.id, task_index as i32, t)?);
        }
    }

    let record_models = records
        .iter()
        .map(|(task_id, record)| record_to_model(task_id, record))
        .collect::<Result<Vec<_>>>()?;

    ListRepository::insert_many(&txn, list_models).await?;
    TaskRepository::insert_many(&txn, task_models).await?;
    SyncRecordRepository::insert_many(&txn, record_models).await?;

    txn.commit().await?;
    Ok(())
}

/// Load the persisted snapshot back into engine-shaped data.
#[allow(clippy::type_complexity)]
pub async fn load(
    conn: &DatabaseConnection,
) -> Result<(
    Vec<TaskList>,
    Vec<(String, Vec<Task>)>,
    Vec<(String, SyncRecord)>,
)> {
    let list_models = ListRepository::get_all(conn).await?;

    let mut lists = Vec::with_capacity(list_models.len());
    let mut tasks_by_list = Vec::with_capacity(list_models.len());
    for list_model in list_models {
        let tasks = TaskRepository::get_for_list(conn, &list_model.id)
            .await?
            .iter()
            .map(task_from_model)
            .collect::<Result<Vec<_>>>()?;
        lists.push(TaskList {
            id: list_model.id.clone(),
            title: list_model.title,
        });
        tasks_by_list.push((list_model.id, tasks));
    }

    let records = SyncRecordRepository::get_all(conn)
        .await?
        .into_iter()
        .map(record_from_model)
        .collect::<Result<Vec<_>>>()?;

    Ok((lists, tasks_by_list, records))
}

fn status_to_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::NeedsAction => "needsAction",
        TaskStatus::Completed => "completed",
    }
}

fn status_from_str(status: &str) -> TaskStatus {
    if status == "completed" {
        TaskStatus::Completed
    } else {
        TaskStatus::NeedsAction
    }
}

fn state_to_str(state: SyncState) -> &'static str {
    match state {
        SyncState::Synced => "synced",
        SyncState::Pending => "pending",
        SyncState::Failed => "failed",
    }
}

fn state_from_str(state: &str) -> SyncState {
    match state {
        "pending" => SyncState::Pending,
        "failed" => SyncState::Failed,
        _ => SyncState::Synced,
    }
}

fn task_to_model(list_id: &str, sort_index: i32, t: &Task) -> Result<task::ActiveModel> {
    Ok(task::ActiveModel {
        id: Set(t.id.clone()),
        list_id: Set(list_id.to_string()),
        parent_id: Set(t.parent_id.clone()),
        title: Set(t.title.clone()),
        notes: Set(t.notes.clone()),
        due_date: Set(t.due.map(datetime::format_ymd)),
        status: Set(status_to_str(t.status).to_string()),
        position: Set(t.position.clone()),
        updated_at: Set(datetime::format_wire_updated(t.updated_at)),
        sort_index: Set(sort_index),
        extras: Set(serde_json::to_string(&t.extras)
            .with_context(|| format!("Failed to serialize extras for task {}", t.id))?),
    })
}

fn task_from_model(m: &task::Model) -> Result<Task> {
    let extras: TaskExtras = if m.extras.is_empty() {
        TaskExtras::default()
    } else {
        serde_json::from_str(&m.extras)
            .with_context(|| format!("Malformed extras column for task {}", m.id))?
    };
    Ok(Task {
        id: m.id.clone(),
        parent_id: m.parent_id.clone(),
        title: m.title.clone(),
        notes: m.notes.clone(),
        due: m.due_date.as_deref().and_then(|d| datetime::parse_date(d).ok()),
        status: status_from_str(&m.status),
        position: m.position.clone(),
        updated_at: datetime::parse_wire_updated(Some(&m.updated_at)),
        extras,
    })
}

fn record_to_model(task_id: &str, record: &SyncRecord) -> Result<sync_record::ActiveModel> {
    Ok(sync_record::ActiveModel {
        task_id: Set(task_id.to_string()),
        state: Set(state_to_str(record.state).to_string()),
        original_list_id: Set(record.original_list_id.clone()),
        target_list_id: Set(record.target_list_id.clone()),
        retry_count: Set(record.retry_count as i32),
        last_error: Set(record.last_error.clone()),
        operation_id: Set(record.operation_id.to_string()),
        original_task: Set(serde_json::to_string(&record.original_task)
            .with_context(|| format!("Failed to serialize snapshot for task {task_id}"))?),
        seq: Set(record.seq as i64),
    })
}

fn record_from_model(m: sync_record::Model) -> Result<(String, SyncRecord)> {
    let original_task: Task = serde_json::from_str(&m.original_task)
        .with_context(|| format!("Malformed snapshot column for task {}", m.task_id))?;
    let operation_id = Uuid::parse_str(&m.operation_id)
        .with_context(|| format!("Malformed operation id for task {}", m.task_id))?;
    Ok((
        m.task_id,
        SyncRecord {
            state: state_from_str(&m.state),
            original_list_id: m.original_list_id,
            target_list_id: m.target_list_id,
            retry_count: m.retry_count as u32,
            last_error: m.last_error,
            operation_id,
            original_task,
            seq: m.seq as u64,
        },
    ))
}
