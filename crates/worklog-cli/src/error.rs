use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] worklog_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Tag not found: {0}")]
    TagNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sync failed: {0}")]
    Sync(String),
    #[error(
        "Sync is not configured. Run `worklog config init` or set WORKLOG_AWS_ACCESS_KEY_ID, WORKLOG_AWS_SECRET_ACCESS_KEY and WORKLOG_PROFILE_ID."
    )]
    SyncNotConfigured,
}
