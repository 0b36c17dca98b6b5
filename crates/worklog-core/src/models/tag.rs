//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CloudId, OwnerId, TagId};
use crate::error::{Error, Result};

/// A label for categorizing work sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Local identity
    pub id: TagId,
    /// Owning user/profile
    pub owner_id: OwnerId,
    /// Display name, trimmed
    pub name: String,
    /// Stable identifier, `None` until first uploaded
    pub cloud_id: Option<CloudId>,
    /// Last mutation timestamp, drives last-write-wins
    pub updated_at: DateTime<Utc>,
    /// Soft delete flag for sync
    pub is_deleted: bool,
}

/// Tag fields prior to local id assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub owner_id: OwnerId,
    pub name: String,
    pub cloud_id: Option<CloudId>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl NewTag {
    /// Create a never-synced tag stamped with the current time
    pub fn new(owner_id: OwnerId, name: &str) -> Result<Self> {
        Ok(Self {
            owner_id,
            name: normalize_tag_name(name)?,
            cloud_id: None,
            updated_at: crate::util::now_millis(),
            is_deleted: false,
        })
    }
}

/// Trim a tag name and reject empty values
pub fn normalize_tag_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Tag name cannot be empty".into()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tag_trims_name() {
        let tag = NewTag::new(OwnerId::new(1), "  Eng ").unwrap();
        assert_eq!(tag.name, "Eng");
        assert!(tag.cloud_id.is_none());
        assert!(!tag.is_deleted);
    }

    #[test]
    fn test_new_tag_rejects_blank_name() {
        let err = NewTag::new(OwnerId::new(1), "   ").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
