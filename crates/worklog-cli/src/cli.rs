use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "worklog")]
#[command(about = "Track work sessions and sync them across devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to sync configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Local owner id whose records are read and synced
    #[arg(long, global = true, value_name = "ID", default_value_t = 1)]
    pub owner: i64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Record and review work sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Reconcile local data with DynamoDB
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Configure remote sync
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum TagCommands {
    /// Create a tag (revives a deleted tag with the same name)
    Add {
        /// Tag name
        name: String,
    },
    /// List tags
    List {
        /// Include deleted tags
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a tag
    Delete {
        /// Tag ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Record a work session
    Add {
        /// Day of the session, YYYY-MM-DD (defaults to today)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
        /// Hours spent, rounded to the nearest half hour
        #[arg(long)]
        hours: f64,
        /// What was done
        #[arg(short, long)]
        description: String,
        /// Additional notes
        #[arg(long)]
        notes: Option<String>,
        /// Next planned stage
        #[arg(long)]
        next_stage: Option<String>,
        /// Tag name
        #[arg(long, value_name = "NAME")]
        tag: Option<String>,
    },
    /// Change a recorded session
    Edit {
        /// Session ID
        id: i64,
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
        #[arg(long)]
        hours: Option<f64>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        next_stage: Option<String>,
        /// Tag name
        #[arg(long, value_name = "NAME", conflicts_with = "no_tag")]
        tag: Option<String>,
        /// Remove the session's tag
        #[arg(long)]
        no_tag: bool,
    },
    /// List sessions
    List {
        /// Only sessions on this day
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a session
    Delete {
        /// Session ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Show whether sync is configured and when it last succeeded
    Status,
    /// Check that the sessions table is reachable
    Test,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the sync configuration
    Init {
        #[arg(long, value_name = "KEY")]
        access_key_id: Option<String>,
        #[arg(long, value_name = "SECRET")]
        secret_access_key: Option<String>,
        #[arg(long, value_name = "REGION")]
        region: Option<String>,
        /// Partition key shared by all devices of one user
        #[arg(long, value_name = "ID")]
        profile_id: Option<String>,
        #[arg(long, value_name = "TABLE")]
        tags_table: Option<String>,
        #[arg(long, value_name = "TABLE")]
        sessions_table: Option<String>,
        /// Endpoint override, e.g. <http://localhost:8000> for DynamoDB Local
        #[arg(long, value_name = "URL")]
        endpoint_url: Option<String>,
    },
    /// Print the effective configuration with secrets masked
    Show,
}
