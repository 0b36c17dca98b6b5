//! Work session repository implementation

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection};

use super::tag_repository::{SqliteTagRepository, TagRepository};
use crate::error::{Error, Result};
use crate::models::{CloudId, NewSession, OwnerId, Session, SessionId, SessionInput, TagId};
use crate::util::{advance_timestamp, from_millis, now_millis};

const SESSION_COLUMNS: &str = "id, owner_id, session_date, hours, description, notes, next_stage, \
     tag_id, tag_cloud_id, cloud_id, created_at, updated_at, is_deleted";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Trait for work session storage operations
pub trait SessionRepository {
    /// Record a new session from user input
    fn create(&self, owner: OwnerId, input: SessionInput) -> Result<Session>;

    /// Replace the user-editable fields of a live session
    fn edit(&self, id: SessionId, input: SessionInput) -> Result<Session>;

    /// Get a session by ID, including soft-deleted sessions
    fn get(&self, id: SessionId) -> Result<Option<Session>>;

    /// List an owner's sessions, newest day first
    fn list_by_owner(&self, owner: OwnerId, include_deleted: bool) -> Result<Vec<Session>>;

    /// List an owner's live sessions for one day
    fn list_for_date(&self, owner: OwnerId, date: NaiveDate) -> Result<Vec<Session>>;

    /// Insert a fully specified session
    fn insert(&self, session: &NewSession) -> Result<Session>;

    /// Overwrite the mutable fields of an existing session
    ///
    /// An assigned stable id is never replaced.
    fn update(&self, session: &Session) -> Result<()>;

    /// Soft delete a session
    fn delete(&self, id: SessionId) -> Result<()>;
}

/// `SQLite` implementation of `SessionRepository`
pub struct SqliteSessionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSessionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Stable id of the live tag a session is about to reference
    fn resolve_tag_cloud_id(&self, owner: OwnerId, tag_id: TagId) -> Result<Option<CloudId>> {
        let tags = SqliteTagRepository::new(self.conn);
        match tags.get(tag_id)? {
            Some(tag) if tag.owner_id == owner && !tag.is_deleted => Ok(tag.cloud_id),
            _ => Err(Error::NotFound(format!("tag {tag_id}"))),
        }
    }

    /// Parse a session from a database row
    fn parse_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
        let raw_date: String = row.get(2)?;
        let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

        Ok(Session {
            id: SessionId::new(row.get(0)?),
            owner_id: OwnerId::new(row.get(1)?),
            date,
            hours: row.get(3)?,
            description: row.get(4)?,
            notes: row.get(5)?,
            next_stage: row.get(6)?,
            tag_id: row.get::<_, Option<i64>>(7)?.map(TagId::new),
            tag_cloud_id: row.get::<_, Option<String>>(8)?.and_then(CloudId::parse),
            cloud_id: row.get::<_, Option<String>>(9)?.and_then(CloudId::parse),
            created_at: from_millis(row.get(10)?),
            updated_at: from_millis(row.get(11)?),
            is_deleted: row.get::<_, i32>(12)? != 0,
        })
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn create(&self, owner: OwnerId, input: SessionInput) -> Result<Session> {
        let input = input.normalized()?;
        let tag_cloud_id = match input.tag_id {
            Some(tag_id) => self.resolve_tag_cloud_id(owner, tag_id)?,
            None => None,
        };

        let now = now_millis();
        self.insert(&NewSession {
            owner_id: owner,
            date: input.date,
            hours: input.hours,
            description: input.description,
            notes: input.notes,
            next_stage: input.next_stage,
            tag_id: input.tag_id,
            tag_cloud_id,
            cloud_id: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        })
    }

    fn edit(&self, id: SessionId, input: SessionInput) -> Result<Session> {
        let mut session = self
            .get(id)?
            .filter(|session| !session.is_deleted)
            .ok_or_else(|| Error::NotFound(format!("session {id}")))?;

        let input = input.normalized()?;
        session.tag_cloud_id = match input.tag_id {
            Some(tag_id) => self.resolve_tag_cloud_id(session.owner_id, tag_id)?,
            None => None,
        };
        session.date = input.date;
        session.hours = input.hours;
        session.description = input.description;
        session.notes = input.notes;
        session.next_stage = input.next_stage;
        session.tag_id = input.tag_id;
        session.updated_at = advance_timestamp(session.updated_at);

        self.update(&session)?;
        Ok(session)
    }

    fn get(&self, id: SessionId) -> Result<Option<Session>> {
        let result = self.conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM work_sessions WHERE id = ?"),
            params![id.get()],
            Self::parse_session,
        );

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_by_owner(&self, owner: OwnerId, include_deleted: bool) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions
             WHERE owner_id = ? AND (? OR is_deleted = 0)
             ORDER BY session_date DESC, id"
        ))?;

        let sessions = stmt
            .query_map(params![owner.get(), include_deleted], Self::parse_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sessions)
    }

    fn list_for_date(&self, owner: OwnerId, date: NaiveDate) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions
             WHERE owner_id = ? AND session_date = ? AND is_deleted = 0
             ORDER BY id"
        ))?;

        let sessions = stmt
            .query_map(
                params![owner.get(), date.format(DATE_FORMAT).to_string()],
                Self::parse_session,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sessions)
    }

    fn insert(&self, session: &NewSession) -> Result<Session> {
        self.conn.execute(
            "INSERT INTO work_sessions (
                owner_id, session_date, hours, description, notes, next_stage,
                tag_id, tag_cloud_id, cloud_id, created_at, updated_at, is_deleted
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                session.owner_id.get(),
                session.date.format(DATE_FORMAT).to_string(),
                session.hours,
                session.description,
                session.notes,
                session.next_stage,
                session.tag_id.map(TagId::get),
                session.tag_cloud_id.as_ref().map(CloudId::as_str),
                session.cloud_id.as_ref().map(CloudId::as_str),
                session.created_at.timestamp_millis(),
                session.updated_at.timestamp_millis(),
                i32::from(session.is_deleted)
            ],
        )?;

        Ok(Session {
            id: SessionId::new(self.conn.last_insert_rowid()),
            owner_id: session.owner_id,
            date: session.date,
            hours: session.hours,
            description: session.description.clone(),
            notes: session.notes.clone(),
            next_stage: session.next_stage.clone(),
            tag_id: session.tag_id,
            tag_cloud_id: session.tag_cloud_id.clone(),
            cloud_id: session.cloud_id.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            is_deleted: session.is_deleted,
        })
    }

    fn update(&self, session: &Session) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE work_sessions
             SET session_date = ?, hours = ?, description = ?, notes = ?, next_stage = ?,
                 tag_id = ?, tag_cloud_id = ?, cloud_id = COALESCE(cloud_id, ?),
                 created_at = ?, updated_at = ?, is_deleted = ?
             WHERE id = ?",
            params![
                session.date.format(DATE_FORMAT).to_string(),
                session.hours,
                session.description,
                session.notes,
                session.next_stage,
                session.tag_id.map(TagId::get),
                session.tag_cloud_id.as_ref().map(CloudId::as_str),
                session.cloud_id.as_ref().map(CloudId::as_str),
                session.created_at.timestamp_millis(),
                session.updated_at.timestamp_millis(),
                i32::from(session.is_deleted),
                session.id.get()
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("session {}", session.id)));
        }

        Ok(())
    }

    fn delete(&self, id: SessionId) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE work_sessions SET is_deleted = 1, updated_at = MAX(?, updated_at + 1)
             WHERE id = ? AND is_deleted = 0",
            params![now_millis().timestamp_millis(), id.get()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!("session {id}")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    const OWNER: OwnerId = OwnerId::new(1);

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn input(date: NaiveDate, hours: f64, description: &str, tag_id: Option<TagId>) -> SessionInput {
        SessionInput {
            date,
            hours,
            description: description.to_string(),
            notes: None,
            next_stage: None,
            tag_id,
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let repo = SqliteSessionRepository::new(db.connection());

        let session = repo
            .create(OWNER, input(day(1), 1.3, " Wrote parser ", None))
            .unwrap();
        assert_eq!(session.description, "Wrote parser");
        assert!((session.hours - 1.5).abs() < f64::EPSILON);
        assert_eq!(session.created_at, session.updated_at);

        let fetched = repo.get(session.id).unwrap().unwrap();
        assert_eq!(fetched, session);
    }

    #[test]
    fn test_create_resolves_tag_cloud_id() {
        let db = setup();
        let tags = SqliteTagRepository::new(db.connection());
        let repo = SqliteSessionRepository::new(db.connection());

        let mut tag = tags.create(OWNER, "Eng").unwrap();
        tag.cloud_id = Some(CloudId::parse("tag-cloud").unwrap());
        tags.update(&tag).unwrap();

        let session = repo
            .create(OWNER, input(day(1), 2.0, "Review", Some(tag.id)))
            .unwrap();
        assert_eq!(session.tag_id, Some(tag.id));
        assert_eq!(session.tag_cloud_id, tag.cloud_id);
    }

    #[test]
    fn test_create_rejects_unknown_or_deleted_tag() {
        let db = setup();
        let tags = SqliteTagRepository::new(db.connection());
        let repo = SqliteSessionRepository::new(db.connection());

        let err = repo
            .create(OWNER, input(day(1), 1.0, "x", Some(TagId::new(99))))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let tag = tags.create(OWNER, "Gone").unwrap();
        tags.delete(tag.id).unwrap();
        let err = repo
            .create(OWNER, input(day(1), 1.0, "x", Some(tag.id)))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_edit_bumps_timestamp_and_keeps_identity() {
        let db = setup();
        let repo = SqliteSessionRepository::new(db.connection());

        let mut session = repo.create(OWNER, input(day(1), 1.0, "Draft", None)).unwrap();
        session.cloud_id = Some(CloudId::parse("s1").unwrap());
        session.updated_at = from_millis(1_000);
        repo.update(&session).unwrap();

        let edited = repo
            .edit(session.id, input(day(2), 0.75, "Final", None))
            .unwrap();
        assert_eq!(edited.id, session.id);
        assert_eq!(edited.cloud_id, session.cloud_id);
        assert_eq!(edited.date, day(2));
        assert!((edited.hours - 1.0).abs() < f64::EPSILON);
        assert!(edited.updated_at > session.updated_at);
        assert_eq!(repo.get(session.id).unwrap().unwrap(), edited);
    }

    #[test]
    fn test_list_for_date_and_delete() {
        let db = setup();
        let repo = SqliteSessionRepository::new(db.connection());

        let first = repo.create(OWNER, input(day(1), 1.0, "A", None)).unwrap();
        repo.create(OWNER, input(day(1), 2.0, "B", None)).unwrap();
        repo.create(OWNER, input(day(2), 3.0, "C", None)).unwrap();
        repo.create(OwnerId::new(2), input(day(1), 4.0, "D", None))
            .unwrap();

        repo.delete(first.id).unwrap();

        let descriptions: Vec<String> = repo
            .list_for_date(OWNER, day(1))
            .unwrap()
            .into_iter()
            .map(|session| session.description)
            .collect();
        assert_eq!(descriptions, vec!["B".to_string()]);

        assert_eq!(repo.list_by_owner(OWNER, false).unwrap().len(), 2);
        assert_eq!(repo.list_by_owner(OWNER, true).unwrap().len(), 3);

        assert!(matches!(repo.delete(first.id), Err(Error::NotFound(_))));
        assert!(matches!(
            repo.edit(first.id, input(day(1), 1.0, "A", None)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_by_owner_newest_day_first() {
        let db = setup();
        let repo = SqliteSessionRepository::new(db.connection());

        repo.create(OWNER, input(day(1), 1.0, "Old", None)).unwrap();
        repo.create(OWNER, input(day(9), 1.0, "New", None)).unwrap();

        let sessions = repo.list_by_owner(OWNER, false).unwrap();
        assert_eq!(sessions[0].description, "New");
        assert_eq!(sessions[1].description, "Old");
    }
}
