use std::path::Path;

use chrono::Utc;
use worklog_core::db::Database;
use worklog_core::sync::{DynamoRemoteStore, RemoteStore};
use worklog_core::{OwnerId, Reconciler, SyncConfig, SyncResult};

use crate::cli::SyncCommands;
use crate::commands::common::{
    format_relative_time, format_sync_timestamp, load_sync_config, open_database,
};
use crate::error::CliError;

pub async fn run_sync(
    command: Option<SyncCommands>,
    owner: OwnerId,
    db_path: &Path,
    config_path: &Path,
) -> Result<(), CliError> {
    let config = load_sync_config(config_path)?;
    let db = open_database(db_path)?;

    match command {
        None => {
            if !config.is_configured() {
                return Err(CliError::SyncNotConfigured);
            }
            config.validate()?;
            let remote = DynamoRemoteStore::new(&config);
            let result = sync_with_remote(&db, config, owner, &remote).await?;
            for line in format_sync_summary(&result) {
                println!("{line}");
            }
        }
        Some(SyncCommands::Status) => {
            for line in sync_status_lines(&db, config, owner)? {
                println!("{line}");
            }
        }
        Some(SyncCommands::Test) => {
            if !config.is_configured() {
                return Err(CliError::SyncNotConfigured);
            }
            config.validate()?;
            let remote = DynamoRemoteStore::new(&config);
            let table = config.sessions_table_name.clone();
            if Reconciler::new(&db, config).test_connection(&remote).await {
                println!("Connected to {table}");
            } else {
                return Err(CliError::Sync(format!("could not reach table {table}")));
            }
        }
    }

    Ok(())
}

/// Reconcile against `remote`, turning a failed run into an error.
pub async fn sync_with_remote<R: RemoteStore>(
    db: &Database,
    config: SyncConfig,
    owner: OwnerId,
    remote: &R,
) -> Result<SyncResult, CliError> {
    let result = Reconciler::new(db, config).reconcile(owner, remote).await;
    tracing::debug!(
        uploaded = result.total_uploaded(),
        downloaded = result.total_downloaded(),
        "Reconcile finished"
    );
    if result.success {
        Ok(result)
    } else {
        let message = result
            .error_message
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        for line in format_sync_summary(&result) {
            eprintln!("{line}");
        }
        Err(CliError::Sync(message))
    }
}

pub fn format_sync_summary(result: &SyncResult) -> Vec<String> {
    let headline = if result.success {
        "Sync completed"
    } else {
        "Sync incomplete"
    };
    vec![
        format!("{headline} at {}", format_sync_timestamp(result.sync_time)),
        format!(
            "Tags: {} uploaded, {} downloaded",
            result.tags_uploaded, result.tags_downloaded
        ),
        format!(
            "Sessions: {} uploaded, {} downloaded",
            result.sessions_uploaded, result.sessions_downloaded
        ),
    ]
}

pub fn sync_status_lines(
    db: &Database,
    config: SyncConfig,
    owner: OwnerId,
) -> Result<Vec<String>, CliError> {
    let reconciler = Reconciler::new(db, config);
    let mut lines = Vec::new();

    if reconciler.is_configured() {
        let config = reconciler.config();
        lines.push(format!(
            "Sync configured: profile '{}' in {}",
            config.profile_id, config.aws_region
        ));
    } else {
        lines.push("Sync not configured".to_string());
    }

    match reconciler.last_sync_time(owner)? {
        Some(at) => lines.push(format!(
            "Last sync: {} ({})",
            format_sync_timestamp(at),
            format_relative_time(at, Utc::now())
        )),
        None => lines.push("Last sync: never".to_string()),
    }

    Ok(lines)
}
