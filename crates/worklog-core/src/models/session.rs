//! Work session model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{CloudId, OwnerId, SessionId, TagId};
use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// A dated unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Local identity
    pub id: SessionId,
    /// Owning user/profile
    pub owner_id: OwnerId,
    /// Day the work happened
    pub date: NaiveDate,
    /// Time spent, in half-hour increments
    pub hours: f64,
    /// What was done (required)
    pub description: String,
    /// Optional free-form notes
    pub notes: Option<String>,
    /// Optional next planned stage
    pub next_stage: Option<String>,
    /// Local tag reference
    pub tag_id: Option<TagId>,
    /// Stable id of the referenced tag, the cross-replica join key
    pub tag_cloud_id: Option<CloudId>,
    /// Stable identifier, `None` until first uploaded
    pub cloud_id: Option<CloudId>,
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp, drives last-write-wins
    pub updated_at: DateTime<Utc>,
    /// Soft delete flag for sync
    pub is_deleted: bool,
}

/// Session fields prior to local id assignment
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub owner_id: OwnerId,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
    pub notes: Option<String>,
    pub next_stage: Option<String>,
    pub tag_id: Option<TagId>,
    pub tag_cloud_id: Option<CloudId>,
    pub cloud_id: Option<CloudId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// User-editable session fields, as entered through the CRUD layer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInput {
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
    pub notes: Option<String>,
    pub next_stage: Option<String>,
    pub tag_id: Option<TagId>,
}

impl SessionInput {
    /// Validate and normalize: hours rounded, text trimmed, empty optionals dropped.
    pub fn normalized(self) -> Result<Self> {
        if !self.hours.is_finite() || self.hours < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Hours must be a non-negative number, got {}",
                self.hours
            )));
        }

        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(Error::InvalidInput(
                "Session description cannot be empty".into(),
            ));
        }

        Ok(Self {
            date: self.date,
            hours: round_hours(self.hours),
            description,
            notes: normalize_text_option(self.notes),
            next_stage: normalize_text_option(self.next_stage),
            tag_id: self.tag_id,
        })
    }
}

/// Round to the nearest half hour, ties to even (`0.25` -> `0.0`, `0.75` -> `1.0`)
#[must_use]
pub fn round_hours(hours: f64) -> f64 {
    (hours * 2.0).round_ties_even() / 2.0
}
