//! Collaborator traits

use async_trait::async_trait;
use haruki_api::{
    Candidate, CatalogUser, Episode, MediaDetail, MediaKind, PlaybackSession, Release,
    ReleaseScope, RequestReceipt, Title, UserId, UserRequest, View, ViewRef,
};
use haruki_util::OwnerKey;

use crate::RemoteResult;

/// Media catalog (search, availability, requests)
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Search the catalog; hits of other kinds are filtered out
    async fn search(&self, query: &str, kind: MediaKind) -> RemoteResult<Vec<Candidate>>;

    /// Fresh detail, including live availability status and requesters
    async fn detail(&self, kind: MediaKind, id: u64) -> RemoteResult<MediaDetail>;

    /// Create a request on behalf of `user`
    async fn submit_request(
        &self,
        kind: MediaKind,
        id: u64,
        user: UserId,
    ) -> RemoteResult<RequestReceipt>;

    /// Profile of a catalog user
    async fn user(&self, id: UserId) -> RemoteResult<CatalogUser>;

    /// Number of requests ever created by `id`
    async fn user_request_total(&self, id: UserId) -> RemoteResult<u32>;

    /// Requests created by `id`, newest first. Requests for fully
    /// available media are left out unless `include_finished`.
    async fn user_requests(&self, id: UserId, include_finished: bool) -> RemoteResult<Vec<UserRequest>>;

    /// Every catalog user with their linked identity
    async fn list_users(&self) -> RemoteResult<Vec<CatalogUser>>;

    /// Store `owner` as the chat identity of catalog user `id`
    async fn link_external_identity(&self, id: UserId, owner: &OwnerKey) -> RemoteResult<()>;
}

/// Maps a chat identity to a catalog user
#[async_trait]
pub trait IdentityLinker: Send + Sync {
    /// `Ok(None)` when the owner has not linked an account
    async fn resolve_external_identity(&self, owner: &OwnerKey) -> RemoteResult<Option<UserId>>;
}

/// Series or movie acquisition service
#[async_trait]
pub trait AcquisitionClient: Send + Sync {
    /// Which kind of media this service manages
    fn kind(&self) -> MediaKind;

    /// Every title the service knows
    async fn list_titles(&self) -> RemoteResult<Vec<Title>>;

    /// Monitored titles with missing files
    async fn list_missing(&self) -> RemoteResult<Vec<Title>>;

    /// Episodes of a series
    async fn list_episodes(&self, title_id: u64) -> RemoteResult<Vec<Episode>>;

    /// Releases the indexers offer for one episode or movie
    async fn list_releases(&self, scope: ReleaseScope) -> RemoteResult<Vec<Release>>;

    /// Hand a release to the download client
    async fn submit_approval(&self, release: &Release) -> RemoteResult<()>;
}

/// Media server activity monitor
#[async_trait]
pub trait ActivityClient: Send + Sync {
    /// Streams playing right now
    async fn current_activity(&self) -> RemoteResult<Vec<PlaybackSession>>;
}

/// Pushes views to the chat side outside a request/response exchange
#[async_trait]
pub trait ViewSink: Send + Sync {
    /// Edit an existing message
    async fn edit(&self, target: &ViewRef, view: View) -> RemoteResult<()>;

    /// Post a new message to a channel
    async fn post(&self, channel_id: &str, content: String, view: View) -> RemoteResult<()>;
}
