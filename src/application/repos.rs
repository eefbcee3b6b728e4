//! Store and auth traits describing the hosted backend adapters.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use url::Url;

use crate::domain::entities::{PostFields, PostId, PostPatch, PostRecord, RowChange, Session};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("post store unavailable: {0}")]
    Transient(String),
    #[error("post not found")]
    NotFound,
    #[error("{0}")]
    Auth(String),
    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),
    #[error("unexpected response from post store: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn transient(err: impl fmt::Display) -> Self {
        Self::Transient(err.to_string())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn decode(err: impl fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Row storage plus per-row change notifications for posts.
///
/// No method carries a timeout; callers must tolerate completions that arrive
/// late or never.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts, newest first.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError>;

    async fn get_post(&self, id: &PostId) -> Result<PostRecord, StoreError>;

    /// Current authoritative applause count for one post.
    async fn fetch_claps(&self, id: &PostId) -> Result<u64, StoreError> {
        self.get_post(id).await.map(|post| post.claps)
    }

    async fn create_post(&self, fields: PostFields) -> Result<PostRecord, StoreError>;

    async fn update_post(&self, id: &PostId, patch: PostPatch) -> Result<(), StoreError>;

    async fn delete_post(&self, id: &PostId) -> Result<(), StoreError>;

    /// Push channel for changes to a single row. Released on drop.
    async fn subscribe(&self, id: &PostId) -> Result<ChangeSubscription, StoreError>;

    /// Whether [`PostStore::increment_claps`] is backed by a server-side
    /// atomic operation.
    fn supports_atomic_increment(&self) -> bool {
        false
    }

    async fn increment_claps(&self, _id: &PostId) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("atomic applause increment"))
    }
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>, StoreError>;

    async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, StoreError>;

    /// Start a federated sign-in. Returns the URL the user must visit; the
    /// resulting session arrives through [`AuthClient::session_changes`].
    async fn sign_in_with_provider(&self, provider: &str) -> Result<Url, StoreError>;

    /// Finish a federated sign-in from the fragment of the redirect URL the
    /// provider sent the user back to.
    async fn complete_provider_sign_in(&self, fragment: &str) -> Result<Session, StoreError>;

    async fn sign_out(&self) -> Result<(), StoreError>;

    /// Process-wide listener that observes every sign-in and sign-out.
    fn session_changes(&self) -> watch::Receiver<Option<Session>>;
}

type ReleaseFn = Box<dyn FnOnce() + Send + 'static>;

/// Live change feed for one post row.
///
/// The handle owns its backend registration: dropping it (or calling
/// [`ChangeSubscription::release`]) unregisters, so no delivery can outlive
/// the owner.
pub struct ChangeSubscription {
    post_id: PostId,
    receiver: mpsc::UnboundedReceiver<RowChange>,
    release: Option<ReleaseFn>,
}

impl ChangeSubscription {
    pub fn new(
        post_id: PostId,
        receiver: mpsc::UnboundedReceiver<RowChange>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            post_id,
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    /// Next change for this row; `None` once the backend closed the feed.
    pub async fn next(&mut self) -> Option<RowChange> {
        self.receiver.recv().await
    }

    /// Already-delivered change, if any, without waiting.
    pub fn try_next(&mut self) -> Option<RowChange> {
        self.receiver.try_recv().ok()
    }

    pub fn release(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        self.receiver.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("post_id", &self.post_id)
            .field("released", &self.release.is_none())
            .finish()
    }
}
