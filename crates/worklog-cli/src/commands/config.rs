use std::path::Path;

use worklog_core::util::normalize_text_option;
use worklog_core::SyncConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::{load_sync_config, mask_secret};
use crate::error::CliError;

/// Explicit values passed to `config init`.
#[derive(Debug, Default)]
pub struct ConfigInit {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub profile_id: Option<String>,
    pub tags_table: Option<String>,
    pub sessions_table: Option<String>,
    pub endpoint_url: Option<String>,
}

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            access_key_id,
            secret_access_key,
            region,
            profile_id,
            tags_table,
            sessions_table,
            endpoint_url,
        } => {
            let config = run_config_init(
                config_path,
                ConfigInit {
                    access_key_id,
                    secret_access_key,
                    region,
                    profile_id,
                    tags_table,
                    sessions_table,
                    endpoint_url,
                },
            )?;
            println!("Saved sync config to {}", config_path.display());
            if !config.is_configured() {
                println!("Sync still needs an access key, secret and profile id.");
            }
        }
        ConfigCommands::Show => {
            let config = load_sync_config(config_path)?;
            println!("Config file: {}", config_path.display());
            for line in config_lines(&config) {
                println!("{line}");
            }
        }
    }

    Ok(())
}

/// Merge explicit values into the stored config and save it.
pub fn run_config_init(config_path: &Path, init: ConfigInit) -> Result<SyncConfig, CliError> {
    let mut config = SyncConfig::load_from_path(config_path)?;

    if let Some(value) = normalize_text_option(init.access_key_id) {
        config.aws_access_key_id = value;
    }
    if let Some(value) = normalize_text_option(init.secret_access_key) {
        config.aws_secret_access_key = value;
    }
    if let Some(value) = normalize_text_option(init.region) {
        config.aws_region = value;
    }
    if let Some(value) = normalize_text_option(init.profile_id) {
        config.profile_id = value;
    }
    if let Some(value) = normalize_text_option(init.tags_table) {
        config.tags_table_name = value;
    }
    if let Some(value) = normalize_text_option(init.sessions_table) {
        config.sessions_table_name = value;
    }
    if let Some(value) = normalize_text_option(init.endpoint_url) {
        config.endpoint_url = Some(value);
    }

    config
        .validate()
        .map_err(|error| CliError::Config(error.to_string()))?;
    config.save_to_path(config_path)?;
    Ok(config)
}

pub fn config_lines(config: &SyncConfig) -> Vec<String> {
    vec![
        format!("aws_access_key_id:     {}", mask_secret(&config.aws_access_key_id)),
        format!(
            "aws_secret_access_key: {}",
            mask_secret(&config.aws_secret_access_key)
        ),
        format!("aws_region:            {}", config.aws_region),
        format!("profile_id:            {}", config.profile_id),
        format!("tags_table_name:       {}", config.tags_table_name),
        format!("sessions_table_name:   {}", config.sessions_table_name),
        format!(
            "endpoint_url:          {}",
            config.endpoint_url.as_deref().unwrap_or("(default)")
        ),
        format!("configured:            {}", config.is_configured()),
    ]
}
