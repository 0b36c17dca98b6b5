//! Remote projections of local records.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{CloudId, NewSession, NewTag, OwnerId, Session, Tag, TagId};

/// A tag as stored in the remote tags table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTag {
    pub profile_id: String,
    pub cloud_id: CloudId,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl RemoteTag {
    pub fn from_tag(profile_id: &str, cloud_id: CloudId, tag: &Tag) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            cloud_id,
            name: tag.name.clone(),
            updated_at: tag.updated_at,
            is_deleted: tag.is_deleted,
        }
    }

    /// Overwrite a losing local copy. Tombstones only flip the delete flag.
    pub(crate) fn apply_to(&self, tag: &mut Tag) {
        if self.is_deleted {
            tag.is_deleted = true;
        } else {
            tag.name.clone_from(&self.name);
            tag.is_deleted = false;
        }
        tag.updated_at = self.updated_at;
    }

    pub(crate) fn to_new_tag(&self, owner: OwnerId) -> NewTag {
        NewTag {
            owner_id: owner,
            name: self.name.clone(),
            cloud_id: Some(self.cloud_id.clone()),
            updated_at: self.updated_at,
            is_deleted: false,
        }
    }
}

/// A work session as stored in the remote sessions table
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSession {
    pub profile_id: String,
    pub cloud_id: CloudId,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
    pub notes: Option<String>,
    pub next_stage: Option<String>,
    pub tag_cloud_id: Option<CloudId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl RemoteSession {
    pub fn from_session(profile_id: &str, cloud_id: CloudId, session: &Session) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            cloud_id,
            date: session.date,
            hours: session.hours,
            description: session.description.clone(),
            notes: session.notes.clone(),
            next_stage: session.next_stage.clone(),
            tag_cloud_id: session.tag_cloud_id.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            is_deleted: session.is_deleted,
        }
    }

    /// Overwrite a losing local copy. `tag_id` is the local tag already
    /// resolved from `tag_cloud_id`.
    pub(crate) fn apply_to(&self, session: &mut Session, tag_id: Option<TagId>) {
        if self.is_deleted {
            session.is_deleted = true;
        } else {
            session.date = self.date;
            session.hours = self.hours;
            session.description.clone_from(&self.description);
            session.notes.clone_from(&self.notes);
            session.next_stage.clone_from(&self.next_stage);
            session.tag_cloud_id.clone_from(&self.tag_cloud_id);
            session.tag_id = tag_id;
            session.created_at = self.created_at;
            session.is_deleted = false;
        }
        session.updated_at = self.updated_at;
    }

    pub(crate) fn to_new_session(&self, owner: OwnerId, tag_id: Option<TagId>) -> NewSession {
        NewSession {
            owner_id: owner,
            date: self.date,
            hours: self.hours,
            description: self.description.clone(),
            notes: self.notes.clone(),
            next_stage: self.next_stage.clone(),
            tag_id,
            tag_cloud_id: self.tag_cloud_id.clone(),
            cloud_id: Some(self.cloud_id.clone()),
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: false,
        }
    }
}
