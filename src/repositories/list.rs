//! List repository for database operations.

use anyhow::Result;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};

use crate::entities::list;

/// Repository for task-list rows of the persisted snapshot.
pub struct ListRepository;

impl ListRepository {
    /// Get all lists in display order.
    pub async fn get_all<C>(conn: &C) -> Result<Vec<list::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(list::Entity::find()
            .order_by_asc(list::Column::SortIndex)
            .all(conn)
            .await?)
    }

    /// Insert a batch of lists.
    pub async fn insert_many<C>(conn: &C, models: Vec<list::ActiveModel>) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if models.is_empty() {
            return Ok(());
        }
        list::Entity::insert_many(models).exec(conn).await?;
        Ok(())
    }

    /// Delete every list row.
    pub async fn clear<C>(conn: &C) -> Result<()>
    where
        C: ConnectionTrait,
    {
        list::Entity::delete_many().exec(conn).await?;
        Ok(())
    }
}
