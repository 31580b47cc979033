use anyhow::{Context, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

use crate::entities::{list, sync_record, task};

/// Local storage manager for the snapshot database.
pub struct LocalStorage {
    pub conn: DatabaseConnection,
}

impl LocalStorage {
    /// Initialize the local storage with a SQLite database.
    ///
    /// `in_memory` backs the storage with an in-memory database (tests,
    /// debug runs); otherwise the database file lives under the platform
    /// data directory.
    pub async fn new(in_memory: bool) -> Result<Self> {
        let database_url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            Self::database_url()?
        };

        let conn = Database::connect(&database_url)
            .await
            .with_context(|| format!("Failed to open database: {database_url}"))?;

        let storage = Self { conn };
        storage.init_schema().await?;
        Ok(storage)
    }

    fn database_url() -> Result<String> {
        let dir = dirs::data_dir()
            .context("Could not determine platform data directory")?
            .join("taskmirror");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        Ok(format!(
            "sqlite://{}?mode=rwc",
            dir.join("taskmirror.db").display()
        ))
    }

    /// Create the snapshot tables if they do not exist yet.
    async fn init_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut statements = [
            schema.create_table_from_entity(list::Entity),
            schema.create_table_from_entity(task::Entity),
            schema.create_table_from_entity(sync_record::Entity),
        ];
        for stmt in &mut statements {
            stmt.if_not_exists();
            self.conn.execute(backend.build(&*stmt)).await?;
        }
        Ok(())
    }
}
