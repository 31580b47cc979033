//! Repository layer for database operations.
//!
//! This module provides repository structs that encapsulate database queries
//! and operations, following the Data Mapper pattern recommended by SeaORM.
//! Repositories keep entities as pure data models while providing reusable
//! database access methods.

pub mod list;
pub mod sync_record;
pub mod task;

pub use list::ListRepository;
pub use sync_record::SyncRecordRepository;
pub use task::TaskRepository;
