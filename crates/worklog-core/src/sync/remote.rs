//! Remote store contract.

use super::records::{RemoteSession, RemoteTag};
use super::RemoteResult;

/// A partitioned key-value store holding every replica's tags and sessions.
///
/// Records are keyed by `(profile_id, cloud_id)`. Puts are idempotent
/// upserts. Implementations never retry; any failure surfaces as
/// [`SyncError::RemoteUnavailable`](super::SyncError::RemoteUnavailable).
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// All tags in a partition, following pagination to the end
    async fn list_tags(&self, profile_id: &str) -> RemoteResult<Vec<RemoteTag>>;

    /// All sessions in a partition, following pagination to the end
    async fn list_sessions(&self, profile_id: &str) -> RemoteResult<Vec<RemoteSession>>;

    async fn put_tag(&self, tag: &RemoteTag) -> RemoteResult<()>;

    async fn put_session(&self, session: &RemoteSession) -> RemoteResult<()>;

    /// Best-effort reachability probe. Never fails, reports `false` instead.
    async fn test_connection(&self) -> bool;
}
