//! SeaORM entity models for the persisted local snapshot.

pub mod list;
pub mod sync_record;
pub mod task;
