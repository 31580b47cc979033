//! Task repository for database operations.

use anyhow::Result;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::task;

/// Repository for task rows of the persisted snapshot.
pub struct TaskRepository;

impl TaskRepository {
    /// Get a single task by id.
    pub async fn get_by_id<C>(conn: &C, id: &str) -> Result<Option<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(task::Column::Id.eq(id))
            .one(conn)
            .await?)
    }

    /// Get all tasks of a list in membership order.
    pub async fn get_for_list<C>(conn: &C, list_id: &str) -> Result<Vec<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .filter(task::Column::ListId.eq(list_id))
            .order_by_asc(task::Column::SortIndex)
            .all(conn)
            .await?)
    }

    /// Get all tasks across all lists.
    pub async fn get_all<C>(conn: &C) -> Result<Vec<task::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(task::Entity::find()
            .order_by_asc(task::Column::ListId)
            .order_by_asc(task::Column::SortIndex)
            .all(conn)
            .await?)
    }

    /// Insert a batch of tasks.
    pub async fn insert_many<C>(conn: &C, models: Vec<task::ActiveModel>) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if models.is_empty() {
            return Ok(());
        }
        task::Entity::insert_many(models).exec(conn).await?;
        Ok(())
    }

    /// Delete every task row.
    pub async fn clear<C>(conn: &C) -> Result<()>
    where
        C: ConnectionTrait,
    {
        task::Entity::delete_many().exec(conn).await?;
        Ok(())
    }
}
