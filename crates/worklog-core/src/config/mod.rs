//! Remote sync configuration.
//!
//! `SyncConfig` names the DynamoDB tables, region and credentials used by the
//! reconciler. It is persisted as pretty JSON and can be overridden per field
//! from `WORKLOG_*` environment variables.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

pub const CONFIG_FILE_NAME: &str = "worklog-sync.json";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TAGS_TABLE: &str = "WorkLog_Tags";
pub const DEFAULT_SESSIONS_TABLE: &str = "WorkLog_Sessions";

const ENV_ACCESS_KEY_ID: &str = "WORKLOG_AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "WORKLOG_AWS_SECRET_ACCESS_KEY";
const ENV_REGION: &str = "WORKLOG_AWS_REGION";
const ENV_PROFILE_ID: &str = "WORKLOG_PROFILE_ID";
const ENV_TAGS_TABLE: &str = "WORKLOG_TAGS_TABLE";
const ENV_SESSIONS_TABLE: &str = "WORKLOG_SESSIONS_TABLE";
const ENV_ENDPOINT_URL: &str = "WORKLOG_DYNAMODB_ENDPOINT_URL";

/// Credentials and table layout for the remote store.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    #[serde(default)]
    pub aws_access_key_id: String,
    #[serde(default)]
    pub aws_secret_access_key: String,
    #[serde(default = "default_region")]
    pub aws_region: String,
    /// Remote partition key shared by every device of one user.
    #[serde(default)]
    pub profile_id: String,
    #[serde(default = "default_tags_table")]
    pub tags_table_name: String,
    #[serde(default = "default_sessions_table")]
    pub sessions_table_name: String,
    /// Endpoint override, e.g. DynamoDB Local.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_tags_table() -> String {
    DEFAULT_TAGS_TABLE.to_string()
}

fn default_sessions_table() -> String {
    DEFAULT_SESSIONS_TABLE.to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            aws_access_key_id: String::new(),
            aws_secret_access_key: String::new(),
            aws_region: default_region(),
            profile_id: String::new(),
            tags_table_name: default_tags_table(),
            sessions_table_name: default_sessions_table(),
            endpoint_url: None,
        }
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field(
                "aws_secret_access_key",
                &if self.aws_secret_access_key.is_empty() {
                    ""
                } else {
                    "<redacted>"
                },
            )
            .field("aws_region", &self.aws_region)
            .field("profile_id", &self.profile_id)
            .field("tags_table_name", &self.tags_table_name)
            .field("sessions_table_name", &self.sessions_table_name)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

impl SyncConfig {
    /// True when credentials and the partition key are all present.
    pub fn is_configured(&self) -> bool {
        !self.aws_access_key_id.trim().is_empty()
            && !self.aws_secret_access_key.trim().is_empty()
            && !self.profile_id.trim().is_empty()
    }

    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw)?;
        config.normalize();
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Overlay values from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay non-empty values returned by `lookup`.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| normalize_text_option(lookup(key));

        if let Some(v) = value(ENV_ACCESS_KEY_ID) {
            self.aws_access_key_id = v;
        }
        if let Some(v) = value(ENV_SECRET_ACCESS_KEY) {
            self.aws_secret_access_key = v;
        }
        if let Some(v) = value(ENV_REGION) {
            self.aws_region = v;
        }
        if let Some(v) = value(ENV_PROFILE_ID) {
            self.profile_id = v;
        }
        if let Some(v) = value(ENV_TAGS_TABLE) {
            self.tags_table_name = v;
        }
        if let Some(v) = value(ENV_SESSIONS_TABLE) {
            self.sessions_table_name = v;
        }
        if let Some(v) = value(ENV_ENDPOINT_URL) {
            self.endpoint_url = Some(v);
        }

        self.normalize();
        self
    }

    /// Reject settings the remote client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.endpoint_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidInput(format!(
                    "endpoint_url must include http:// or https://, got '{url}'"
                )));
            }
        }
        if self.tags_table_name == self.sessions_table_name {
            return Err(Error::InvalidInput(
                "tags and sessions must use different tables".to_string(),
            ));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.aws_access_key_id = self.aws_access_key_id.trim().to_string();
        self.aws_secret_access_key = self.aws_secret_access_key.trim().to_string();
        self.profile_id = self.profile_id.trim().to_string();
        self.aws_region = normalize_text_option(Some(std::mem::take(&mut self.aws_region)))
            .unwrap_or_else(default_region);
        self.tags_table_name =
            normalize_text_option(Some(std::mem::take(&mut self.tags_table_name)))
                .unwrap_or_else(default_tags_table);
        self.sessions_table_name =
            normalize_text_option(Some(std::mem::take(&mut self.sessions_table_name)))
                .unwrap_or_else(default_sessions_table);
        self.endpoint_url = normalize_text_option(self.endpoint_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
    }
}
