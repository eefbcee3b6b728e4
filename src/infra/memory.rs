//! In-process post store and auth client.
//!
//! Used for the offline demo and as the backing store in tests. Change
//! notifications are pushed synchronously from every successful write.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use metrics::gauge;
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

use crate::application::repos::{AuthClient, ChangeSubscription, PostStore, StoreError};
use crate::domain::entities::{PostFields, PostId, PostPatch, PostRecord, RowChange, Session};
use crate::domain::posts::demo_posts;

const OFFLINE_MESSAGE: &str = "post store offline";
const METRIC_OPEN_SUBSCRIPTIONS: &str = "claplog_open_subscriptions";

struct Subscriber {
    post_id: PostId,
    sender: mpsc::UnboundedSender<RowChange>,
}

type Subscribers = Arc<DashMap<u64, Subscriber>>;

pub struct MemoryPostStore {
    rows: DashMap<PostId, PostRecord>,
    subscribers: Subscribers,
    next_subscriber: AtomicU64,
    next_id: AtomicU64,
    offline: AtomicBool,
    atomic_increment: bool,
}

impl Default for MemoryPostStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::with_posts(Vec::new())
    }

    /// Store pre-populated with the demo posts.
    pub fn seeded() -> Self {
        Self::with_posts(demo_posts())
    }

    pub fn with_posts(posts: impl IntoIterator<Item = PostRecord>) -> Self {
        let rows = DashMap::new();
        let mut highest = 0;
        for post in posts {
            if let Ok(numeric) = post.id.as_str().parse::<u64>() {
                highest = highest.max(numeric);
            }
            rows.insert(post.id.clone(), post);
        }

        Self {
            rows,
            subscribers: Arc::new(DashMap::new()),
            next_subscriber: AtomicU64::new(1),
            next_id: AtomicU64::new(highest + 1),
            offline: AtomicBool::new(false),
            atomic_increment: false,
        }
    }

    /// Advertise and serve a server-side atomic applause increment.
    pub fn with_atomic_increment(mut self, enabled: bool) -> Self {
        self.atomic_increment = enabled;
        self
    }

    /// Make every call fail with a transient error until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Live subscriptions registered for `id`.
    pub fn active_subscriptions(&self, id: &PostId) -> usize {
        self.subscribers
            .iter()
            .filter(|entry| &entry.value().post_id == id)
            .count()
    }

    pub fn claps(&self, id: &PostId) -> Option<u64> {
        self.rows.get(id).map(|row| row.claps)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::transient(OFFLINE_MESSAGE));
        }
        Ok(())
    }

    fn notify(&self, change: RowChange) {
        let mut closed = Vec::new();
        for entry in self.subscribers.iter() {
            if &entry.value().post_id != change.post_id() {
                continue;
            }
            if entry.value().sender.send(change.clone()).is_err() {
                closed.push(*entry.key());
            }
        }
        for key in closed {
            self.subscribers.remove(&key);
        }
        trace!(post_id = %change.post_id(), "row change published");
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError> {
        self.ensure_online()?;
        let mut posts: Vec<PostRecord> = self.rows.iter().map(|row| row.value().clone()).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn get_post(&self, id: &PostId) -> Result<PostRecord, StoreError> {
        self.ensure_online()?;
        self.rows
            .get(id)
            .map(|row| row.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn create_post(&self, fields: PostFields) -> Result<PostRecord, StoreError> {
        self.ensure_online()?;
        let now = OffsetDateTime::now_utc();
        let id = PostId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());
        let record = PostRecord {
            id: id.clone(),
            title: fields.title,
            content: fields.content,
            tags: fields.tags,
            image: fields.image,
            excerpt: None,
            created_at: now,
            updated_at: now,
            claps: 0,
        };
        self.rows.insert(id.clone(), record.clone());
        debug!(post_id = %id, "post created");
        Ok(record)
    }

    async fn update_post(&self, id: &PostId, patch: PostPatch) -> Result<(), StoreError> {
        self.ensure_online()?;
        let updated = {
            let mut row = self.rows.get_mut(id).ok_or(StoreError::NotFound)?;
            patch.apply_to(row.value_mut());
            row.value().clone()
        };
        self.notify(RowChange::Updated(updated));
        Ok(())
    }

    async fn delete_post(&self, id: &PostId) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.rows.remove(id).ok_or(StoreError::NotFound)?;
        debug!(post_id = %id, "post deleted");
        self.notify(RowChange::Deleted(id.clone()));
        Ok(())
    }

    async fn subscribe(&self, id: &PostId) -> Result<ChangeSubscription, StoreError> {
        self.ensure_online()?;
        let key = self.next_subscriber.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.insert(
            key,
            Subscriber {
                post_id: id.clone(),
                sender,
            },
        );

        gauge!(METRIC_OPEN_SUBSCRIPTIONS).set(self.subscribers.len() as f64);

        let subscribers = Arc::clone(&self.subscribers);
        Ok(ChangeSubscription::new(id.clone(), receiver, move || {
            subscribers.remove(&key);
            gauge!(METRIC_OPEN_SUBSCRIPTIONS).set(subscribers.len() as f64);
        }))
    }

    fn supports_atomic_increment(&self) -> bool {
        self.atomic_increment
    }

    async fn increment_claps(&self, id: &PostId) -> Result<(), StoreError> {
        if !self.atomic_increment {
            return Err(StoreError::Unsupported("atomic applause increment"));
        }
        self.ensure_online()?;
        let updated = {
            let mut row = self.rows.get_mut(id).ok_or(StoreError::NotFound)?;
            row.claps = row.claps.saturating_add(1);
            row.value().clone()
        };
        self.notify(RowChange::Updated(updated));
        Ok(())
    }
}

/// Credential check against a fixed account list.
pub struct MemoryAuthClient {
    accounts: Vec<(String, String)>,
    session: watch::Sender<Option<Session>>,
}

impl MemoryAuthClient {
    pub fn new(accounts: impl IntoIterator<Item = (String, String)>) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: accounts.into_iter().collect(),
            session,
        }
    }
}

fn new_session(email: &str) -> Session {
    Session {
        user_id: Uuid::new_v4().to_string(),
        email: Some(email.to_string()),
        access_token: Uuid::new_v4().simple().to_string(),
        expires_at: None,
    }
}

#[async_trait]
impl AuthClient for MemoryAuthClient {
    async fn get_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.session.borrow().clone())
    }

    async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, StoreError> {
        let known = self
            .accounts
            .iter()
            .any(|(account, secret)| account == email && secret == password);
        if !known {
            return Err(StoreError::auth("Invalid login credentials"));
        }

        let session = new_session(email);
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_provider(&self, provider: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse("memory://auth/authorize").map_err(StoreError::decode)?;
        url.query_pairs_mut().append_pair("provider", provider);
        Ok(url)
    }

    /// The demo provider hands back `#email=...` for the account it vouched for.
    async fn complete_provider_sign_in(&self, fragment: &str) -> Result<Session, StoreError> {
        let email = url::form_urlencoded::parse(fragment.trim_start_matches('#').as_bytes())
            .find(|(key, _)| key == "email")
            .map(|(_, value)| value.into_owned())
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| StoreError::auth("redirect did not name an account"))?;

        let session = new_session(&email);
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        self.session.send_replace(None);
        Ok(())
    }

    fn session_changes(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}
