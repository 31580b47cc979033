//! Sync record repository for database operations.

use anyhow::Result;
use sea_orm::{ConnectionTrait, EntityTrait};

use crate::entities::sync_record;

/// Repository for persisted per-task sync bookkeeping.
pub struct SyncRecordRepository;

impl SyncRecordRepository {
    /// Get all sync records.
    pub async fn get_all<C>(conn: &C) -> Result<Vec<sync_record::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(sync_record::Entity::find().all(conn).await?)
    }

    /// Insert a batch of sync records.
    pub async fn insert_many<C>(conn: &C, models: Vec<sync_record::ActiveModel>) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if models.is_empty() {
            return Ok(());
        }
        sync_record::Entity::insert_many(models).exec(conn).await?;
        Ok(())
    }

    /// Delete every sync record row.
    pub async fn clear<C>(conn: &C) -> Result<()>
    where
        C: ConnectionTrait,
    {
        sync_record::Entity::delete_many().exec(conn).await?;
        Ok(())
    }
}
