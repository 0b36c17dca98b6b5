//! Database layer for WorkLog

mod connection;
mod migrations;
mod session_repository;
mod sync_metadata;
mod tag_repository;

pub use connection::Database;
pub use session_repository::{SessionRepository, SqliteSessionRepository};
pub use sync_metadata::{SqliteSyncMetadataRepository, SyncMetadataRepository};
pub use tag_repository::{SqliteTagRepository, TagRepository};
