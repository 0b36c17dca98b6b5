use std::path::Path;

use chrono::{Local, NaiveDate};
use worklog_core::db::{Database, SessionRepository, SqliteSessionRepository};
use worklog_core::models::SessionInput;
use worklog_core::{OwnerId, Session, SessionId};

use crate::cli::SessionCommands;
use crate::commands::common::{
    find_tag, format_session_lines, open_database, session_to_list_item, tag_names, total_hours,
    SessionListItem,
};
use crate::error::CliError;

pub fn run_session(
    command: SessionCommands,
    owner: OwnerId,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path)?;

    match command {
        SessionCommands::Add {
            date,
            hours,
            description,
            notes,
            next_stage,
            tag,
        } => {
            let tag_id = match tag.as_deref() {
                Some(name) => Some(find_tag(&db, owner, name)?.id),
                None => None,
            };
            let session = SqliteSessionRepository::new(db.connection()).create(
                owner,
                SessionInput {
                    date: date.unwrap_or_else(today),
                    hours,
                    description,
                    notes,
                    next_stage,
                    tag_id,
                },
            )?;
            println!("{}", session.id);
        }
        SessionCommands::Edit {
            id,
            date,
            hours,
            description,
            notes,
            next_stage,
            tag,
            no_tag,
        } => {
            let session = edit_session(
                &db,
                owner,
                SessionId::new(id),
                SessionEdit {
                    date,
                    hours,
                    description,
                    notes,
                    next_stage,
                    tag,
                    no_tag,
                },
            )?;
            println!("{}", session.id);
        }
        SessionCommands::List { date, json } => {
            let sessions = list_sessions(&db, owner, date)?;
            let tags = tag_names(&db, owner)?;
            if json {
                let json_items = sessions
                    .iter()
                    .map(|session| session_to_list_item(session, &tags))
                    .collect::<Vec<SessionListItem>>();
                println!("{}", serde_json::to_string_pretty(&json_items)?);
            } else if sessions.is_empty() {
                println!("No sessions recorded.");
            } else {
                for line in format_session_lines(&sessions, &tags) {
                    println!("{line}");
                }
                println!("Total: {:.1}h", total_hours(&sessions));
            }
        }
        SessionCommands::Delete { id } => {
            let id = SessionId::new(id);
            SqliteSessionRepository::new(db.connection()).delete(id)?;
            println!("{id}");
        }
    }

    Ok(())
}

/// Optional replacements for a session's editable fields.
#[derive(Debug, Default)]
pub struct SessionEdit {
    pub date: Option<NaiveDate>,
    pub hours: Option<f64>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub next_stage: Option<String>,
    pub tag: Option<String>,
    pub no_tag: bool,
}

pub fn edit_session(
    db: &Database,
    owner: OwnerId,
    id: SessionId,
    edit: SessionEdit,
) -> Result<Session, CliError> {
    let repo = SqliteSessionRepository::new(db.connection());
    let current = repo
        .get(id)?
        .filter(|session| session.owner_id == owner && !session.is_deleted)
        .ok_or_else(|| worklog_core::Error::NotFound(format!("session {id}")))?;

    let tag_id = if edit.no_tag {
        None
    } else if let Some(name) = edit.tag.as_deref() {
        Some(find_tag(db, owner, name)?.id)
    } else {
        current.tag_id
    };

    Ok(repo.edit(
        id,
        SessionInput {
            date: edit.date.unwrap_or(current.date),
            hours: edit.hours.unwrap_or(current.hours),
            description: edit.description.unwrap_or(current.description),
            notes: edit.notes.or(current.notes),
            next_stage: edit.next_stage.or(current.next_stage),
            tag_id,
        },
    )?)
}

pub fn list_sessions(
    db: &Database,
    owner: OwnerId,
    date: Option<NaiveDate>,
) -> Result<Vec<Session>, CliError> {
    let repo = SqliteSessionRepository::new(db.connection());
    let sessions = match date {
        Some(date) => repo.list_for_date(owner, date)?,
        None => repo.list_by_owner(owner, false)?,
    };
    Ok(sessions)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
