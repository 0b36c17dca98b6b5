//! AWS DynamoDB remote store and item codec.

use std::collections::HashMap;

use aws_credential_types::Credentials;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use aws_types::region::Region;
use chrono::{DateTime, NaiveDate, Utc};

use super::records::{RemoteSession, RemoteTag};
use super::remote::RemoteStore;
use super::{RemoteResult, SyncError};
use crate::config::SyncConfig;
use crate::models::CloudId;
use crate::util::{format_timestamp, normalize_text_option, parse_timestamp};

type Item = HashMap<String, AttributeValue>;

const ATTR_PROFILE_ID: &str = "ProfileId";
const ATTR_CLOUD_ID: &str = "CloudId";
const ATTR_NAME: &str = "Name";
const ATTR_SESSION_DATE: &str = "SessionDate";
const ATTR_TIME_HOURS: &str = "TimeHours";
const ATTR_DESCRIPTION: &str = "Description";
const ATTR_NOTES: &str = "Notes";
const ATTR_NEXT_STAGE: &str = "NextPlannedStage";
const ATTR_TAG_CLOUD_ID: &str = "TagCloudId";
const ATTR_CREATED_AT: &str = "CreatedAt";
const ATTR_UPDATED_AT: &str = "UpdatedAt";
const ATTR_IS_DELETED: &str = "IsDeleted";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// DynamoDB-backed [`RemoteStore`].
///
/// Both tables use `ProfileId` as partition key and `CloudId` as sort key.
#[derive(Clone, Debug)]
pub struct DynamoRemoteStore {
    client: Client,
    tags_table: String,
    sessions_table: String,
}

impl DynamoRemoteStore {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            client: build_dynamodb_client(config),
            tags_table: config.tags_table_name.clone(),
            sessions_table: config.sessions_table_name.clone(),
        }
    }

    /// Every item in one partition of `table`.
    async fn query_partition(&self, table: &str, profile_id: &str) -> RemoteResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let response = self
                .client
                .query()
                .table_name(table)
                .key_condition_expression("ProfileId = :profileId")
                .expression_attribute_values(
                    ":profileId",
                    AttributeValue::S(profile_id.to_string()),
                )
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|error| remote_error("query", table, error))?;

            items.extend(response.items().iter().cloned());

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        tracing::debug!("Fetched {} items from {table}", items.len());
        Ok(items)
    }

    async fn put_item(&self, table: &str, item: Item) -> RemoteResult<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|error| remote_error("put_item", table, error))?;
        Ok(())
    }
}

impl RemoteStore for DynamoRemoteStore {
    async fn list_tags(&self, profile_id: &str) -> RemoteResult<Vec<RemoteTag>> {
        let items = self.query_partition(&self.tags_table, profile_id).await?;
        Ok(items.iter().filter_map(decode_tag).collect())
    }

    async fn list_sessions(&self, profile_id: &str) -> RemoteResult<Vec<RemoteSession>> {
        let items = self.query_partition(&self.sessions_table, profile_id).await?;
        Ok(items.iter().filter_map(decode_session).collect())
    }

    async fn put_tag(&self, tag: &RemoteTag) -> RemoteResult<()> {
        self.put_item(&self.tags_table, encode_tag(tag)).await
    }

    async fn put_session(&self, session: &RemoteSession) -> RemoteResult<()> {
        self.put_item(&self.sessions_table, encode_session(session))
            .await
    }

    async fn test_connection(&self) -> bool {
        match self
            .client
            .describe_table()
            .table_name(&self.sessions_table)
            .send()
            .await
        {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(
                    "DynamoDB connection test failed for {}: {}",
                    self.sessions_table,
                    DisplayErrorContext(&error)
                );
                false
            }
        }
    }
}

fn build_dynamodb_client(config: &SyncConfig) -> Client {
    let credentials = Credentials::new(
        config.aws_access_key_id.clone(),
        config.aws_secret_access_key.clone(),
        None,
        None,
        "worklog-core-sync-config",
    );

    let mut builder = aws_sdk_dynamodb::config::Builder::new()
        .region(Region::new(config.aws_region.clone()))
        .credentials_provider(credentials);

    if let Some(endpoint_url) = &config.endpoint_url {
        builder = builder.endpoint_url(endpoint_url);
    }

    Client::from_conf(builder.build())
}

fn remote_error<E>(operation: &str, table: &str, error: E) -> SyncError
where
    E: std::error::Error,
{
    SyncError::RemoteUnavailable(format!(
        "DynamoDB {operation} failed for {table}: {}",
        DisplayErrorContext(&error)
    ))
}

fn encode_tag(tag: &RemoteTag) -> Item {
    HashMap::from([
        (ATTR_PROFILE_ID.to_string(), AttributeValue::S(tag.profile_id.clone())),
        (ATTR_CLOUD_ID.to_string(), AttributeValue::S(tag.cloud_id.to_string())),
        (ATTR_NAME.to_string(), AttributeValue::S(tag.name.clone())),
        (
            ATTR_UPDATED_AT.to_string(),
            AttributeValue::S(format_timestamp(tag.updated_at)),
        ),
        (ATTR_IS_DELETED.to_string(), AttributeValue::Bool(tag.is_deleted)),
    ])
}

fn decode_tag(item: &Item) -> Option<RemoteTag> {
    let cloud_id = decode_cloud_id(item)?;
    Some(RemoteTag {
        profile_id: string_attr(item, ATTR_PROFILE_ID).unwrap_or_default(),
        cloud_id,
        name: string_attr(item, ATTR_NAME).unwrap_or_default(),
        updated_at: timestamp_attr(item, ATTR_UPDATED_AT),
        is_deleted: bool_attr(item, ATTR_IS_DELETED),
    })
}

fn encode_session(session: &RemoteSession) -> Item {
    let mut item = HashMap::from([
        (
            ATTR_PROFILE_ID.to_string(),
            AttributeValue::S(session.profile_id.clone()),
        ),
        (
            ATTR_CLOUD_ID.to_string(),
            AttributeValue::S(session.cloud_id.to_string()),
        ),
        (
            ATTR_SESSION_DATE.to_string(),
            AttributeValue::S(session.date.format(DATE_FORMAT).to_string()),
        ),
        (
            ATTR_TIME_HOURS.to_string(),
            AttributeValue::N(session.hours.to_string()),
        ),
        (
            ATTR_DESCRIPTION.to_string(),
            AttributeValue::S(session.description.clone()),
        ),
        (
            ATTR_CREATED_AT.to_string(),
            AttributeValue::S(format_timestamp(session.created_at)),
        ),
        (
            ATTR_UPDATED_AT.to_string(),
            AttributeValue::S(format_timestamp(session.updated_at)),
        ),
        (
            ATTR_IS_DELETED.to_string(),
            AttributeValue::Bool(session.is_deleted),
        ),
    ]);

    // DynamoDB rejects empty strings in non-key attributes
    let optional = [
        (ATTR_NOTES, session.notes.as_deref()),
        (ATTR_NEXT_STAGE, session.next_stage.as_deref()),
        (ATTR_TAG_CLOUD_ID, session.tag_cloud_id.as_ref().map(CloudId::as_str)),
    ];
    for (name, value) in optional {
        if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
            item.insert(name.to_string(), AttributeValue::S(value.to_string()));
        }
    }

    item
}

fn decode_session(item: &Item) -> Option<RemoteSession> {
    let cloud_id = decode_cloud_id(item)?;

    let date = string_attr(item, ATTR_SESSION_DATE)
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok())
        .unwrap_or_else(|| {
            tracing::warn!("Session {cloud_id} has no valid {ATTR_SESSION_DATE}");
            DateTime::UNIX_EPOCH.date_naive()
        });

    let hours = item
        .get(ATTR_TIME_HOURS)
        .and_then(|value| value.as_n().ok())
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|hours| hours.is_finite())
        .unwrap_or(0.0);

    Some(RemoteSession {
        profile_id: string_attr(item, ATTR_PROFILE_ID).unwrap_or_default(),
        cloud_id,
        date,
        hours,
        description: string_attr(item, ATTR_DESCRIPTION).unwrap_or_default(),
        notes: normalize_text_option(string_attr(item, ATTR_NOTES)),
        next_stage: normalize_text_option(string_attr(item, ATTR_NEXT_STAGE)),
        tag_cloud_id: string_attr(item, ATTR_TAG_CLOUD_ID).and_then(CloudId::parse),
        created_at: timestamp_attr(item, ATTR_CREATED_AT),
        updated_at: timestamp_attr(item, ATTR_UPDATED_AT),
        is_deleted: bool_attr(item, ATTR_IS_DELETED),
    })
}

fn decode_cloud_id(item: &Item) -> Option<CloudId> {
    let cloud_id = string_attr(item, ATTR_CLOUD_ID).and_then(CloudId::parse);
    if cloud_id.is_none() {
        tracing::warn!("Skipping remote item without {ATTR_CLOUD_ID}");
    }
    cloud_id
}

fn string_attr(item: &Item, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
}

fn bool_attr(item: &Item, name: &str) -> bool {
    item.get(name)
        .and_then(|value| value.as_bool().ok())
        .copied()
        .unwrap_or(false)
}

fn timestamp_attr(item: &Item, name: &str) -> DateTime<Utc> {
    string_attr(item, name)
        .and_then(|raw| parse_timestamp(&raw))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
