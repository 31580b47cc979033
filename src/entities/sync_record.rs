use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub task_id: String,
    pub state: String,
    pub original_list_id: String,
    pub target_list_id: String,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub operation_id: String,
    /// Pre-mutation task snapshot, serialized as JSON.
    pub original_task: String,
    pub seq: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
