use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use worklog_core::config::CONFIG_FILE_NAME;
use worklog_core::db::{Database, SqliteTagRepository, TagRepository};
use worklog_core::{OwnerId, Session, SyncConfig, Tag, TagId};

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct TagListItem {
    pub id: i64,
    pub name: String,
    pub cloud_id: Option<String>,
    pub updated_at: String,
    pub is_deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionListItem {
    pub id: i64,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
    pub notes: Option<String>,
    pub next_stage: Option<String>,
    pub tag: Option<String>,
    pub cloud_id: Option<String>,
    pub updated_at: String,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("WORKLOG_DB_PATH").map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("worklog").join("worklog.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_config_path {
        return Ok(path);
    }
    default_config_path()
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("worklog").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))
}

pub fn open_database(path: &Path) -> Result<Database, CliError> {
    tracing::debug!(path = %path.display(), "Opening local database");
    Ok(Database::open(path)?)
}

/// Sync configuration from the file with environment overrides applied.
pub fn load_sync_config(path: &Path) -> Result<SyncConfig, CliError> {
    Ok(SyncConfig::load_from_path(path)?.with_env_overrides())
}

pub fn find_tag(db: &Database, owner: OwnerId, name: &str) -> Result<Tag, CliError> {
    SqliteTagRepository::new(db.connection())
        .find_by_name(owner, name)?
        .ok_or_else(|| CliError::TagNotFound(name.trim().to_string()))
}

/// Names of every tag the owner has, deleted ones included.
pub fn tag_names(db: &Database, owner: OwnerId) -> Result<HashMap<TagId, String>, CliError> {
    Ok(SqliteTagRepository::new(db.connection())
        .list_by_owner(owner, true)?
        .into_iter()
        .map(|tag| (tag.id, tag.name))
        .collect())
}

pub fn tag_to_list_item(tag: &Tag) -> TagListItem {
    TagListItem {
        id: tag.id.get(),
        name: tag.name.clone(),
        cloud_id: tag.cloud_id.as_ref().map(ToString::to_string),
        updated_at: format_sync_timestamp(tag.updated_at),
        is_deleted: tag.is_deleted,
    }
}

pub fn session_to_list_item(session: &Session, tags: &HashMap<TagId, String>) -> SessionListItem {
    SessionListItem {
        id: session.id.get(),
        date: session.date,
        hours: session.hours,
        description: session.description.clone(),
        notes: session.notes.clone(),
        next_stage: session.next_stage.clone(),
        tag: session.tag_id.and_then(|id| tags.get(&id).cloned()),
        cloud_id: session.cloud_id.as_ref().map(ToString::to_string),
        updated_at: format_sync_timestamp(session.updated_at),
    }
}

pub fn format_tag_lines(tags: &[Tag]) -> Vec<String> {
    tags.iter()
        .map(|tag| {
            let status = if tag.is_deleted { "deleted" } else { "" };
            let synced = if tag.cloud_id.is_some() { "synced" } else { "local" };
            format!("{:>5}  {:<24}  {synced:<6}  {status}", tag.id.get(), tag.name)
                .trim_end()
                .to_string()
        })
        .collect()
}

pub fn format_session_lines(sessions: &[Session], tags: &HashMap<TagId, String>) -> Vec<String> {
    sessions
        .iter()
        .map(|session| {
            let tag = session
                .tag_id
                .and_then(|id| tags.get(&id))
                .map_or_else(String::new, |name| format!("#{name}"));
            format!(
                "{:>5}  {}  {:>5.1}h  {:<14}  {}",
                session.id.get(),
                session.date,
                session.hours,
                tag,
                description_preview(&session.description, 60)
            )
        })
        .collect()
}

pub fn description_preview(description: &str, max_chars: usize) -> String {
    let first_line = description.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn total_hours(sessions: &[Session]) -> f64 {
    sessions.iter().map(|session| session.hours).sum()
}

pub fn format_sync_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now
        .signed_duration_since(timestamp)
        .num_milliseconds()
        .max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Show only the last four characters of a credential.
pub fn mask_secret(value: &str) -> String {
    let count = value.chars().count();
    if count == 0 {
        return "(not set)".to_string();
    }
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail = value.chars().skip(count - 4).collect::<String>();
    format!("{}{tail}", "*".repeat(count - 4))
}
