//! In-process remote store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Mutex;

use super::records::{RemoteSession, RemoteTag};
use super::remote::RemoteStore;
use super::{RemoteResult, SyncError};

type Key = (String, String);

/// A [`RemoteStore`] held in memory, with fault injection for tests.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    tags: Mutex<BTreeMap<Key, RemoteTag>>,
    sessions: Mutex<BTreeMap<Key, RemoteSession>>,
    calls: AtomicUsize,
    puts: AtomicUsize,
    put_limit: AtomicUsize,
    unavailable: AtomicBool,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self {
            tags: Mutex::default(),
            sessions: Mutex::default(),
            calls: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            put_limit: AtomicUsize::new(usize::MAX),
            unavailable: AtomicBool::new(false),
        }
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `limit` more puts, then fail every put after that.
    pub fn fail_puts_after(&self, limit: usize) {
        let done = self.puts.load(Ordering::SeqCst);
        self.put_limit
            .store(done.saturating_add(limit), Ordering::SeqCst);
    }

    /// Make every call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of remote calls made, probes included
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn tags(&self, profile_id: &str) -> Vec<RemoteTag> {
        self.tags
            .lock()
            .await
            .values()
            .filter(|tag| tag.profile_id == profile_id)
            .cloned()
            .collect()
    }

    pub async fn sessions(&self, profile_id: &str) -> Vec<RemoteSession> {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|session| session.profile_id == profile_id)
            .cloned()
            .collect()
    }

    fn begin_call(&self) -> RemoteResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn begin_put(&self) -> RemoteResult<()> {
        self.begin_call()?;
        let attempt = self.puts.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.put_limit.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable(format!(
                "memory store rejected put #{}",
                attempt + 1
            )));
        }
        Ok(())
    }
}

impl RemoteStore for MemoryRemoteStore {
    async fn list_tags(&self, profile_id: &str) -> RemoteResult<Vec<RemoteTag>> {
        self.begin_call()?;
        Ok(self.tags(profile_id).await)
    }

    async fn list_sessions(&self, profile_id: &str) -> RemoteResult<Vec<RemoteSession>> {
        self.begin_call()?;
        Ok(self.sessions(profile_id).await)
    }

    async fn put_tag(&self, tag: &RemoteTag) -> RemoteResult<()> {
        self.begin_put()?;
        let key = (tag.profile_id.clone(), tag.cloud_id.to_string());
        self.tags.lock().await.insert(key, tag.clone());
        Ok(())
    }

    async fn put_session(&self, session: &RemoteSession) -> RemoteResult<()> {
        self.begin_put()?;
        let key = (session.profile_id.clone(), session.cloud_id.to_string());
        self.sessions.lock().await.insert(key, session.clone());
        Ok(())
    }

    async fn test_connection(&self) -> bool {
        self.begin_call().is_ok()
    }
}
