//! Sync metadata repository implementation

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::OwnerId;
use crate::util::{format_timestamp, parse_timestamp};

/// Trait for sync bookkeeping storage operations
pub trait SyncMetadataRepository {
    /// Last successful sync for an owner, `None` if never synced
    fn get_watermark(&self, owner: OwnerId) -> Result<Option<DateTime<Utc>>>;

    /// Record a successful sync for an owner
    fn set_watermark(&self, owner: OwnerId, at: DateTime<Utc>) -> Result<()>;
}

/// `SQLite` implementation of `SyncMetadataRepository`
pub struct SqliteSyncMetadataRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSyncMetadataRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn watermark_key(owner: OwnerId) -> String {
        format!("last_sync_{owner}")
    }

    fn get_value(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM sync_metadata WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_metadata (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SyncMetadataRepository for SqliteSyncMetadataRepository<'_> {
    fn get_watermark(&self, owner: OwnerId) -> Result<Option<DateTime<Utc>>> {
        let key = Self::watermark_key(owner);
        let Some(raw) = self.get_value(&key)? else {
            return Ok(None);
        };

        let parsed = parse_timestamp(&raw);
        if parsed.is_none() {
            tracing::warn!("Ignoring unparsable sync watermark for {key}: {raw}");
        }
        Ok(parsed)
    }

    fn set_watermark(&self, owner: OwnerId, at: DateTime<Utc>) -> Result<()> {
        self.set_value(&Self::watermark_key(owner), &format_timestamp(at))
    }
}
