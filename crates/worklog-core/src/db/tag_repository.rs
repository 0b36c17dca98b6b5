//! Tag repository implementation

use crate::error::{Error, Result};
use crate::models::{normalize_tag_name, CloudId, NewTag, OwnerId, Tag, TagId};
use crate::util::{advance_timestamp, from_millis, now_millis};
use rusqlite::{params, Connection, OptionalExtension};

const TAG_COLUMNS: &str = "id, owner_id, name, cloud_id, updated_at, is_deleted";

/// Trait for tag storage operations
pub trait TagRepository {
    /// Create a tag by name, resurrecting a soft-deleted tag of the same name
    fn create(&self, owner: OwnerId, name: &str) -> Result<Tag>;

    /// Get a tag by ID, including soft-deleted tags
    fn get(&self, id: TagId) -> Result<Option<Tag>>;

    /// Find a live tag by exact name
    fn find_by_name(&self, owner: OwnerId, name: &str) -> Result<Option<Tag>>;

    /// List an owner's tags ordered by name
    fn list_by_owner(&self, owner: OwnerId, include_deleted: bool) -> Result<Vec<Tag>>;

    /// Insert a fully specified tag
    fn insert(&self, tag: &NewTag) -> Result<Tag>;

    /// Overwrite the mutable fields of an existing tag
    ///
    /// An assigned stable id is never replaced.
    fn update(&self, tag: &Tag) -> Result<()>;

    /// Soft delete a tag
    fn delete(&self, id: TagId) -> Result<()>;
}

/// `SQLite` implementation of `TagRepository`
pub struct SqliteTagRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTagRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Most recently updated tombstone carrying this name
    fn find_tombstone(&self, owner: OwnerId, name: &str) -> Result<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                &format!(
                    "SELECT {TAG_COLUMNS} FROM tags
                     WHERE owner_id = ? AND name = ? AND is_deleted = 1
                     ORDER BY updated_at DESC, id DESC
                     LIMIT 1"
                ),
                params![owner.get(), name],
                Self::parse_tag,
            )
            .optional()?;
        Ok(tag)
    }

    /// Parse a tag from a database row
    fn parse_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
        Ok(Tag {
            id: TagId::new(row.get(0)?),
            owner_id: OwnerId::new(row.get(1)?),
            name: row.get(2)?,
            cloud_id: row.get::<_, Option<String>>(3)?.and_then(CloudId::parse),
            updated_at: from_millis(row.get(4)?),
            is_deleted: row.get::<_, i32>(5)? != 0,
        })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create(&self, owner: OwnerId, name: &str) -> Result<Tag> {
        let name = normalize_tag_name(name)?;

        if self.find_by_name(owner, &name)?.is_some() {
            return Err(Error::Duplicate(format!("Tag '{name}' already exists")));
        }

        if let Some(mut tag) = self.find_tombstone(owner, &name)? {
            tag.is_deleted = false;
            tag.updated_at = advance_timestamp(tag.updated_at);
            self.update(&tag)?;
            tracing::debug!(tag_id = %tag.id, "Resurrected soft-deleted tag '{name}'");
            return Ok(tag);
        }

        self.insert(&NewTag::new(owner, &name)?)
    }

    fn get(&self, id: TagId) -> Result<Option<Tag>> {
        let result = self.conn.query_row(
            &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?"),
            params![id.get()],
            Self::parse_tag,
        );

        match result {
            Ok(tag) => Ok(Some(tag)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_name(&self, owner: OwnerId, name: &str) -> Result<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                &format!(
                    "SELECT {TAG_COLUMNS} FROM tags
                     WHERE owner_id = ? AND name = ? AND is_deleted = 0
                     ORDER BY id
                     LIMIT 1"
                ),
                params![owner.get(), name.trim()],
                Self::parse_tag,
            )
            .optional()?;
        Ok(tag)
    }

    fn list_by_owner(&self, owner: OwnerId, include_deleted: bool) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TAG_COLUMNS} FROM tags
             WHERE owner_id = ? AND (? OR is_deleted = 0)
             ORDER BY name, id"
        ))?;

        let tags = stmt
            .query_map(params![owner.get(), include_deleted], Self::parse_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    fn insert(&self, tag: &NewTag) -> Result<Tag> {
        self.conn.execute(
            "INSERT INTO tags (owner_id, name, cloud_id, updated_at, is_deleted)
             VALUES (?, ?, ?, ?, ?)",
            params![
                tag.owner_id.get(),
                tag.name,
                tag.cloud_id.as_ref().map(CloudId::as_str),
                tag.updated_at.timestamp_millis(),
                i32::from(tag.is_deleted)
            ],
        )?;

        Ok(Tag {
            id: TagId::new(self.conn.last_insert_rowid()),
            owner_id: tag.owner_id,
            name: tag.name.clone(),
            cloud_id: tag.cloud_id.clone(),
            updated_at: tag.updated_at,
            is_deleted: tag.is_deleted,
        })
    }

    fn update(&self, tag: &Tag) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE tags
             SET name = ?, cloud_id = COALESCE(cloud_id, ?), updated_at = ?, is_deleted = ?
             WHERE id = ?",
            params![
                tag.name,
                tag.cloud_id.as_ref().map(CloudId::as_str),
                tag.updated_at.timestamp_millis(),
                i32::from(tag.is_deleted),
                tag.id.get()
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("tag {}", tag.id)));
        }

        Ok(())
    }

    fn delete(&self, id: TagId) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE tags SET is_deleted = 1, updated_at = MAX(?, updated_at + 1)
             WHERE id = ? AND is_deleted = 0",
            params![now_millis().timestamp_millis(), id.get()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("tag {id}")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    const OWNER: OwnerId = OwnerId::new(1);

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let repo = SqliteTagRepository::new(db.connection());

        let tag = repo.create(OWNER, "  Eng ").unwrap();
        assert_eq!(tag.name, "Eng");
        assert!(tag.cloud_id.is_none());

        let fetched = repo.get(tag.id).unwrap().unwrap();
        assert_eq!(fetched, tag);
    }

    #[test]
    fn test_create_rejects_live_duplicate_and_blank() {
        let db = setup();
        let repo = SqliteTagRepository::new(db.connection());

        repo.create(OWNER, "Eng").unwrap();
        let err = repo.create(OWNER, "Eng").unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));

        let err = repo.create(OWNER, "  ").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        // Other owners have their own namespace
        repo.create(OwnerId::new(2), "Eng").unwrap();
    }

    #[test]
    fn test_create_resurrects_tombstone() {
        let db = setup();
        let repo = SqliteTagRepository::new(db.connection());

        let original = repo.create(OWNER, "Eng").unwrap();
        let mut synced = original.clone();
        synced.cloud_id = Some(CloudId::mint());
        repo.update(&synced).unwrap();
        repo.delete(original.id).unwrap();

        let revived = repo.create(OWNER, "Eng").unwrap();
        assert_eq!(revived.id, original.id);
        assert_eq!(revived.cloud_id, synced.cloud_id);
        assert!(!revived.is_deleted);
        assert_eq!(repo.list_by_owner(OWNER, true).unwrap().len(), 1);
    }

    #[test]
    fn test_list_by_owner_filters_deleted() {
        let db = setup();
        let repo = SqliteTagRepository::new(db.connection());

        let zeta = repo.create(OWNER, "Zeta").unwrap();
        repo.create(OWNER, "Alpha").unwrap();
        repo.create(OwnerId::new(9), "Other").unwrap();
        repo.delete(zeta.id).unwrap();

        let live: Vec<String> = repo
            .list_by_owner(OWNER, false)
            .unwrap()
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        assert_eq!(live, vec!["Alpha".to_string()]);

        let all = repo.list_by_owner(OWNER, true).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|tag| tag.is_deleted));
    }

    #[test]
    fn test_delete_bumps_timestamp_once() {
        let db = setup();
        let repo = SqliteTagRepository::new(db.connection());

        let mut tag = repo.create(OWNER, "Eng").unwrap();
        tag.updated_at = from_millis(1_000);
        repo.update(&tag).unwrap();

        repo.delete(tag.id).unwrap();
        let deleted = repo.get(tag.id).unwrap().unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.updated_at > tag.updated_at);

        let err = repo.delete(tag.id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(repo.find_by_name(OWNER, "Eng").unwrap().is_none());
    }

    #[test]
    fn test_update_keeps_assigned_cloud_id() {
        let db = setup();
        let repo = SqliteTagRepository::new(db.connection());

        let first = CloudId::parse("first").unwrap();
        let inserted = repo
            .insert(&NewTag {
                owner_id: OWNER,
                name: "Eng".to_string(),
                cloud_id: Some(first.clone()),
                updated_at: from_millis(5),
                is_deleted: false,
            })
            .unwrap();

        let mut changed = inserted.clone();
        changed.cloud_id = Some(CloudId::parse("second").unwrap());
        changed.name = "Engineering".to_string();
        repo.update(&changed).unwrap();

        let fetched = repo.get(inserted.id).unwrap().unwrap();
        assert_eq!(fetched.cloud_id, Some(first));
        assert_eq!(fetched.name, "Engineering");
        assert_eq!(fetched.updated_at, from_millis(5));
    }

    #[test]
    fn test_update_missing_tag() {
        let db = setup();
        let repo = SqliteTagRepository::new(db.connection());

        let ghost = Tag {
            id: TagId::new(42),
            owner_id: OWNER,
            name: "Ghost".to_string(),
            cloud_id: None,
            updated_at: now_millis(),
            is_deleted: false,
        };
        assert!(matches!(repo.update(&ghost), Err(Error::NotFound(_))));
    }
}
