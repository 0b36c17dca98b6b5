//! Last-write-wins reconciliation of tags and sessions.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::records::{RemoteSession, RemoteTag};
use super::remote::RemoteStore;
use super::{RemoteResult, SyncError, SyncResult};
use crate::config::SyncConfig;
use crate::db::{
    Database, SessionRepository, SqliteSessionRepository, SqliteSyncMetadataRepository,
    SqliteTagRepository, SyncMetadataRepository, TagRepository,
};
use crate::error::Result;
use crate::models::{CloudId, NewTag, OwnerId, Tag, TagId};
use crate::util::now_millis;

/// Drives a sync between one local database and a remote store.
///
/// Tags are reconciled before sessions so that session tag references can be
/// resolved against stable ids. Each pass commits its own local transaction.
pub struct Reconciler<'db> {
    db: &'db Database,
    config: SyncConfig,
}

impl<'db> Reconciler<'db> {
    pub const fn new(db: &'db Database, config: SyncConfig) -> Self {
        Self { db, config }
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Replace the configuration used by later calls.
    pub fn reload_config(&mut self, config: SyncConfig) {
        self.config = config;
    }

    /// Time of the last successful reconcile for `owner`.
    pub fn last_sync_time(&self, owner: OwnerId) -> Result<Option<DateTime<Utc>>> {
        SqliteSyncMetadataRepository::new(self.db.connection()).get_watermark(owner)
    }

    pub async fn test_connection<R: RemoteStore>(&self, remote: &R) -> bool {
        if !self.is_configured() {
            return false;
        }
        remote.test_connection().await
    }

    /// Run one full reconciliation. Failures are reported in the result.
    pub async fn reconcile<R: RemoteStore>(&self, owner: OwnerId, remote: &R) -> SyncResult {
        let mut result = SyncResult::started();

        if !self.is_configured() {
            tracing::warn!("Skipping sync for owner {owner}: not configured");
            result.error_message = Some(SyncError::NotConfigured.to_string());
            return result;
        }

        match self.run(owner, remote, &mut result).await {
            Ok(()) => {
                result.success = true;
                tracing::info!(
                    "Sync complete for owner {owner}: {} uploaded, {} downloaded",
                    result.total_uploaded(),
                    result.total_downloaded()
                );
            }
            Err(error) => {
                tracing::warn!("Sync failed for owner {owner}: {error}");
                result.error_message = Some(error.to_string());
            }
        }

        result
    }

    async fn run<R: RemoteStore>(
        &self,
        owner: OwnerId,
        remote: &R,
        result: &mut SyncResult,
    ) -> RemoteResult<()> {
        self.reconcile_tags(owner, remote, result).await?;
        self.reconcile_sessions(owner, remote, result).await?;

        SqliteSyncMetadataRepository::new(self.db.connection())
            .set_watermark(owner, now_millis())?;
        Ok(())
    }

    async fn reconcile_tags<R: RemoteStore>(
        &self,
        owner: OwnerId,
        remote: &R,
        result: &mut SyncResult,
    ) -> RemoteResult<()> {
        let profile_id = self.config.profile_id.as_str();
        let remote_tags = remote.list_tags(profile_id).await?;

        let tx = self.db.connection().unchecked_transaction()?;
        let repo = SqliteTagRepository::new(&tx);

        let local_tags = repo.list_by_owner(owner, true)?;
        let mut live_names: HashSet<String> = local_tags
            .iter()
            .filter(|tag| !tag.is_deleted)
            .map(|tag| tag.name.clone())
            .collect();
        // Never-synced live tags, matched by name against new remote tags
        let mut unsynced_by_name: HashMap<String, Tag> = HashMap::new();
        for tag in &local_tags {
            if tag.cloud_id.is_none() && !tag.is_deleted {
                unsynced_by_name
                    .entry(tag.name.clone())
                    .or_insert_with(|| tag.clone());
            }
        }
        let local_by_cloud: HashMap<CloudId, _> = local_tags
            .into_iter()
            .filter_map(|tag| tag.cloud_id.clone().map(|cloud_id| (cloud_id, tag)))
            .collect();
        let remote_by_cloud: HashMap<&str, &RemoteTag> = remote_tags
            .iter()
            .map(|tag| (tag.cloud_id.as_str(), tag))
            .collect();

        for remote_tag in &remote_tags {
            match local_by_cloud.get(&remote_tag.cloud_id) {
                Some(local) if remote_tag.updated_at > local.updated_at => {
                    let mut updated = local.clone();
                    remote_tag.apply_to(&mut updated);
                    repo.update(&updated)?;
                    if !updated.is_deleted {
                        live_names.insert(updated.name);
                    }
                    result.tags_downloaded += 1;
                    tracing::debug!("Downloaded newer tag {}", remote_tag.cloud_id);
                }
                Some(_) => {}
                None if remote_tag.is_deleted => {
                    tracing::debug!("Ignoring unknown tag tombstone {}", remote_tag.cloud_id);
                }
                None => {
                    if let Some(mut local) = unsynced_by_name.remove(&remote_tag.name) {
                        local.cloud_id = Some(remote_tag.cloud_id.clone());
                        if remote_tag.updated_at > local.updated_at {
                            remote_tag.apply_to(&mut local);
                            result.tags_downloaded += 1;
                        }
                        repo.update(&local)?;
                        tracing::debug!(
                            tag_id = %local.id,
                            "Matched local tag '{}' to remote tag {}",
                            local.name,
                            remote_tag.cloud_id
                        );
                    } else if live_names.contains(&remote_tag.name) {
                        tracing::warn!(
                            "Remote tag {} duplicates live tag '{}'; keeping it deleted locally",
                            remote_tag.cloud_id,
                            remote_tag.name
                        );
                        repo.insert(&NewTag {
                            is_deleted: true,
                            ..remote_tag.to_new_tag(owner)
                        })?;
                    } else {
                        repo.insert(&remote_tag.to_new_tag(owner))?;
                        live_names.insert(remote_tag.name.clone());
                        result.tags_downloaded += 1;
                        tracing::debug!("Downloaded new tag {}", remote_tag.cloud_id);
                    }
                }
            }
        }

        for mut tag in repo.list_by_owner(owner, true)? {
            let cloud_id = match tag.cloud_id.clone() {
                Some(cloud_id) => match remote_by_cloud.get(cloud_id.as_str()) {
                    Some(existing) if tag.updated_at <= existing.updated_at => continue,
                    _ => cloud_id,
                },
                None => {
                    let cloud_id = CloudId::mint();
                    tag.cloud_id = Some(cloud_id.clone());
                    repo.update(&tag)?;
                    tracing::debug!(tag_id = %tag.id, "Assigned stable id {cloud_id}");
                    cloud_id
                }
            };

            remote
                .put_tag(&RemoteTag::from_tag(profile_id, cloud_id, &tag))
                .await?;
            result.tags_uploaded += 1;
        }

        tx.commit()?;
        tracing::info!(
            "Reconciled tags for owner {owner}: {} uploaded, {} downloaded",
            result.tags_uploaded,
            result.tags_downloaded
        );
        Ok(())
    }

    async fn reconcile_sessions<R: RemoteStore>(
        &self,
        owner: OwnerId,
        remote: &R,
        result: &mut SyncResult,
    ) -> RemoteResult<()> {
        let profile_id = self.config.profile_id.as_str();
        let remote_sessions = remote.list_sessions(profile_id).await?;

        let tx = self.db.connection().unchecked_transaction()?;
        let tags = SqliteTagRepository::new(&tx).list_by_owner(owner, true)?;
        let repo = SqliteSessionRepository::new(&tx);

        // Downloads may only point at live tags; uploads resolve any tag row
        let live_tag_by_cloud: HashMap<&str, TagId> = tags
            .iter()
            .filter(|tag| !tag.is_deleted)
            .filter_map(|tag| tag.cloud_id.as_ref().map(|cloud_id| (cloud_id.as_str(), tag.id)))
            .collect();
        let cloud_by_tag: HashMap<TagId, Option<&CloudId>> = tags
            .iter()
            .map(|tag| (tag.id, tag.cloud_id.as_ref()))
            .collect();
        let resolve_tag = |tag_cloud_id: Option<&CloudId>| {
            tag_cloud_id.and_then(|cloud_id| live_tag_by_cloud.get(cloud_id.as_str()).copied())
        };

        let local_by_cloud: HashMap<CloudId, _> = repo
            .list_by_owner(owner, true)?
            .into_iter()
            .filter_map(|session| {
                session
                    .cloud_id
                    .clone()
                    .map(|cloud_id| (cloud_id, session))
            })
            .collect();
        let remote_by_cloud: HashMap<&str, &RemoteSession> = remote_sessions
            .iter()
            .map(|session| (session.cloud_id.as_str(), session))
            .collect();

        for remote_session in &remote_sessions {
            let tag_id = resolve_tag(remote_session.tag_cloud_id.as_ref());
            match local_by_cloud.get(&remote_session.cloud_id) {
                Some(local) if remote_session.updated_at > local.updated_at => {
                    let mut updated = local.clone();
                    remote_session.apply_to(&mut updated, tag_id);
                    repo.update(&updated)?;
                    result.sessions_downloaded += 1;
                    tracing::debug!("Downloaded newer session {}", remote_session.cloud_id);
                }
                Some(_) => {}
                None if remote_session.is_deleted => {
                    tracing::debug!(
                        "Ignoring unknown session tombstone {}",
                        remote_session.cloud_id
                    );
                }
                None => {
                    repo.insert(&remote_session.to_new_session(owner, tag_id))?;
                    result.sessions_downloaded += 1;
                    tracing::debug!("Downloaded new session {}", remote_session.cloud_id);
                }
            }
        }

        for mut session in repo.list_by_owner(owner, true)? {
            if let Some(tag_id) = session.tag_id {
                let resolved = cloud_by_tag.get(&tag_id).copied().flatten().cloned();
                if resolved != session.tag_cloud_id {
                    session.tag_cloud_id = resolved;
                    repo.update(&session)?;
                }
            }

            let cloud_id = match session.cloud_id.clone() {
                Some(cloud_id) => match remote_by_cloud.get(cloud_id.as_str()) {
                    Some(existing) if session.updated_at <= existing.updated_at => continue,
                    _ => cloud_id,
                },
                None => {
                    let cloud_id = CloudId::mint();
                    session.cloud_id = Some(cloud_id.clone());
                    repo.update(&session)?;
                    tracing::debug!(session_id = %session.id, "Assigned stable id {cloud_id}");
                    cloud_id
                }
            };

            remote
                .put_session(&RemoteSession::from_session(profile_id, cloud_id, &session))
                .await?;
            result.sessions_uploaded += 1;
        }

        tx.commit()?;
        tracing::info!(
            "Reconciled sessions for owner {owner}: {} uploaded, {} downloaded",
            result.sessions_uploaded,
            result.sessions_downloaded
        );
        Ok(())
    }
}
