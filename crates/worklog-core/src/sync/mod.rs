//! Bidirectional reconciliation between the local store and DynamoDB.

mod dynamo;
mod memory;
mod reconciler;
mod records;
mod remote;


use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use dynamo::DynamoRemoteStore;
pub use memory::MemoryRemoteStore;
pub use reconciler::Reconciler;
pub use records::{RemoteSession, RemoteTag};
pub use remote::RemoteStore;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync not configured. Please configure AWS credentials and a profile id.")]
    NotConfigured,
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),
    #[error(transparent)]
    Local(#[from] crate::Error),
}

impl From<rusqlite::Error> for SyncError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Local(error.into())
    }
}

pub type RemoteResult<T> = Result<T, SyncError>;

/// Outcome of one reconciliation.
///
/// Counters are filled in as work completes, so a failed run still reports
/// what it managed before the fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub tags_uploaded: usize,
    pub tags_downloaded: usize,
    pub sessions_uploaded: usize,
    pub sessions_downloaded: usize,
    pub sync_time: DateTime<Utc>,
}

impl SyncResult {
    fn started() -> Self {
        Self {
            success: false,
            error_message: None,
            tags_uploaded: 0,
            tags_downloaded: 0,
            sessions_uploaded: 0,
            sessions_downloaded: 0,
            sync_time: crate::util::now_millis(),
        }
    }

    pub const fn total_uploaded(&self) -> usize {
        self.tags_uploaded + self.sessions_uploaded
    }

    pub const fn total_downloaded(&self) -> usize {
        self.tags_downloaded + self.sessions_downloaded
    }
}
