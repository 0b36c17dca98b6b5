use std::path::Path;

use worklog_core::db::{SqliteTagRepository, TagRepository};
use worklog_core::{OwnerId, TagId};

use crate::cli::TagCommands;
use crate::commands::common::{format_tag_lines, open_database, tag_to_list_item, TagListItem};
use crate::error::CliError;

pub fn run_tag(command: TagCommands, owner: OwnerId, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let repo = SqliteTagRepository::new(db.connection());

    match command {
        TagCommands::Add { name } => {
            let tag = repo.create(owner, &name)?;
            println!("{}", tag.id);
        }
        TagCommands::List { all, json } => {
            let tags = repo.list_by_owner(owner, all)?;
            if json {
                let json_items = tags.iter().map(tag_to_list_item).collect::<Vec<TagListItem>>();
                println!("{}", serde_json::to_string_pretty(&json_items)?);
            } else if tags.is_empty() {
                println!("No tags yet.");
            } else {
                for line in format_tag_lines(&tags) {
                    println!("{line}");
                }
            }
        }
        TagCommands::Delete { id } => {
            let id = TagId::new(id);
            repo.delete(id)?;
            println!("{id}");
        }
    }

    Ok(())
}
