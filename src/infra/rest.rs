//! HTTP adapters for a hosted PostgREST + GoTrue backend.
//!
//! Rows are read and written through `/rest/v1/posts`; sessions come from
//! `/auth/v1`. The backend's realtime socket is not used: change
//! subscriptions poll the subscribed row and publish differences.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use url::Url;

use crate::application::repos::{AuthClient, ChangeSubscription, PostStore, StoreError};
use crate::domain::entities::{PostFields, PostId, PostPatch, PostRecord, RowChange, Session};
use crate::infra::error::InfraError;

const POSTS_PATH: &str = "rest/v1/posts";
const RPC_PATH: &str = "rest/v1/rpc/";
const TOKEN_PATH: &str = "auth/v1/token";
const LOGOUT_PATH: &str = "auth/v1/logout";
const AUTHORIZE_PATH: &str = "auth/v1/authorize";
const USER_PATH: &str = "auth/v1/user";
const PREFER_REPRESENTATION: &str = "return=representation";
const METRIC_REQUEST_MS: &str = "claplog_backend_request_ms";

/// Shared HTTP client plus the project's public key.
#[derive(Clone)]
struct Endpoint {
    http: Client,
    base: Url,
    anon_key: String,
}

impl Endpoint {
    fn new(base: &Url, anon_key: &str) -> Result<Self, InfraError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(concat!("claplog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            http,
            base,
            anon_key: anon_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        self.base.join(path).map_err(StoreError::decode)
    }

    fn posts_url(&self, query: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut url = self.url(POSTS_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Requests carry the user's access token when signed in, the anon key
    /// otherwise.
    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }
}

fn id_filter(id: &PostId) -> (&'static str, String) {
    ("id", format!("eq.{id}"))
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| format!("request failed with status {status}"))
}

fn error_for_status(status: StatusCode, body: &[u8]) -> StoreError {
    let message = error_message(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Auth(message),
        StatusCode::NOT_FOUND => StoreError::NotFound,
        _ => StoreError::Transient(message),
    }
}

async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
    let started = Instant::now();
    let response = request.send().await.map_err(StoreError::transient)?;
    histogram!(METRIC_REQUEST_MS).record(started.elapsed().as_secs_f64() * 1000.0);
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.map_err(StoreError::transient)?;
    Err(error_for_status(status, &body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let bytes = response.bytes().await.map_err(StoreError::transient)?;
    serde_json::from_slice(&bytes).map_err(StoreError::decode)
}

fn first_row<T>(rows: Vec<T>) -> Result<T, StoreError> {
    rows.into_iter().next().ok_or(StoreError::NotFound)
}

fn session_token(session: &watch::Receiver<Option<Session>>) -> Option<String> {
    session
        .borrow()
        .as_ref()
        .map(|session| session.access_token.clone())
}

async fn fetch_row(
    endpoint: &Endpoint,
    token: Option<&str>,
    id: &PostId,
) -> Result<Option<PostRecord>, StoreError> {
    let url = endpoint.posts_url(&[("select", "*".to_string()), id_filter(id)])?;
    let response = send(endpoint.request(Method::GET, url, token)).await?;
    let rows: Vec<PostRecord> = read_json(response).await?;
    Ok(rows.into_iter().next())
}

pub struct RestPostStore {
    endpoint: Endpoint,
    session: watch::Receiver<Option<Session>>,
    poll_interval: Duration,
    increment_rpc: Option<String>,
}

impl RestPostStore {
    /// `session` is usually [`RestAuthClient::session_changes`], so writes
    /// carry the signed-in user's token.
    pub fn new(
        base: &Url,
        anon_key: &str,
        session: watch::Receiver<Option<Session>>,
    ) -> Result<Self, InfraError> {
        Ok(Self {
            endpoint: Endpoint::new(base, anon_key)?,
            session,
            poll_interval: Duration::from_secs(2),
            increment_rpc: None,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Name of a server function that increments `claps` atomically.
    pub fn with_increment_rpc(mut self, function: Option<String>) -> Self {
        self.increment_rpc = function;
        self
    }

    fn token(&self) -> Option<String> {
        session_token(&self.session)
    }
}

#[async_trait]
impl PostStore for RestPostStore {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError> {
        let url = self.endpoint.posts_url(&[
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ])?;
        let token = self.token();
        let response = send(self.endpoint.request(Method::GET, url, token.as_deref())).await?;
        read_json(response).await
    }

    async fn get_post(&self, id: &PostId) -> Result<PostRecord, StoreError> {
        let token = self.token();
        fetch_row(&self.endpoint, token.as_deref(), id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn fetch_claps(&self, id: &PostId) -> Result<u64, StoreError> {
        #[derive(Deserialize)]
        struct ClapsRow {
            #[serde(default)]
            claps: Option<u64>,
        }

        let url = self
            .endpoint
            .posts_url(&[("select", "claps".to_string()), id_filter(id)])?;
        let token = self.token();
        let response = send(self.endpoint.request(Method::GET, url, token.as_deref())).await?;
        let rows: Vec<ClapsRow> = read_json(response).await?;
        Ok(first_row(rows)?.claps.unwrap_or(0))
    }

    async fn create_post(&self, fields: PostFields) -> Result<PostRecord, StoreError> {
        let now = OffsetDateTime::now_utc();
        let timestamp = now
            .format(&Rfc3339)
            .map_err(StoreError::decode)?;
        let body = json!({
            "title": fields.title,
            "content": fields.content,
            "tags": fields.tags,
            "image": fields.image,
            "claps": 0,
            "created_at": timestamp,
            "updated_at": timestamp,
        });

        let url = self.endpoint.posts_url(&[])?;
        let token = self.token();
        let request = self
            .endpoint
            .request(Method::POST, url, token.as_deref())
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&body);
        let rows: Vec<PostRecord> = read_json(send(request).await?).await?;
        first_row(rows)
    }

    async fn update_post(&self, id: &PostId, patch: PostPatch) -> Result<(), StoreError> {
        let url = self.endpoint.posts_url(&[id_filter(id)])?;
        let token = self.token();
        let request = self
            .endpoint
            .request(Method::PATCH, url, token.as_deref())
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&patch);
        let rows: Vec<serde_json::Value> = read_json(send(request).await?).await?;
        first_row(rows).map(|_| ())
    }

    async fn delete_post(&self, id: &PostId) -> Result<(), StoreError> {
        let url = self.endpoint.posts_url(&[id_filter(id)])?;
        let token = self.token();
        let request = self
            .endpoint
            .request(Method::DELETE, url, token.as_deref())
            .header("Prefer", PREFER_REPRESENTATION);
        let rows: Vec<serde_json::Value> = read_json(send(request).await?).await?;
        first_row(rows).map(|_| ())
    }

    async fn subscribe(&self, id: &PostId) -> Result<ChangeSubscription, StoreError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(poll_row(
            self.endpoint.clone(),
            self.session.clone(),
            id.clone(),
            self.poll_interval,
            sender,
        ));
        debug!(post_id = %id, interval_ms = self.poll_interval.as_millis() as u64, "row polling started");
        Ok(ChangeSubscription::new(id.clone(), receiver, move || {
            task.abort();
        }))
    }

    fn supports_atomic_increment(&self) -> bool {
        self.increment_rpc.is_some()
    }

    async fn increment_claps(&self, id: &PostId) -> Result<(), StoreError> {
        let Some(function) = self.increment_rpc.as_deref() else {
            return Err(StoreError::Unsupported("atomic applause increment"));
        };
        let url = self.endpoint.url(&format!("{RPC_PATH}{function}"))?;
        let token = self.token();
        let request = self
            .endpoint
            .request(Method::POST, url, token.as_deref())
            .json(&json!({ "post_id": id }));
        send(request).await?;
        Ok(())
    }
}

/// Publish a change whenever the polled row differs from the last one seen.
///
/// The first successful read only establishes the baseline.
async fn poll_row(
    endpoint: Endpoint,
    session: watch::Receiver<Option<Session>>,
    post_id: PostId,
    period: Duration,
    sender: mpsc::UnboundedSender<RowChange>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen: Option<PostRecord> = None;

    loop {
        ticker.tick().await;
        if sender.is_closed() {
            break;
        }

        let token = session_token(&session);
        match fetch_row(&endpoint, token.as_deref(), &post_id).await {
            Ok(Some(row)) => {
                // The first row is delivered too: a write may land between the
                // caller's own read and this poll.
                let changed = last_seen.as_ref() != Some(&row);
                if changed && sender.send(RowChange::Updated(row.clone())).is_err() {
                    break;
                }
                last_seen = Some(row);
            }
            Ok(None) => {
                if last_seen.is_some() {
                    let _ = sender.send(RowChange::Deleted(post_id.clone()));
                    break;
                }
            }
            Err(err) => {
                debug!(post_id = %post_id, error = %err, "row poll failed; retrying");
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserResponse,
}

fn expiry(expires_in: Option<i64>) -> Option<OffsetDateTime> {
    expires_in.map(|seconds| OffsetDateTime::now_utc() + time::Duration::seconds(seconds))
}

pub struct RestAuthClient {
    endpoint: Endpoint,
    session: watch::Sender<Option<Session>>,
}

impl RestAuthClient {
    pub fn new(base: &Url, anon_key: &str) -> Result<Self, InfraError> {
        let (session, _) = watch::channel(None);
        Ok(Self {
            endpoint: Endpoint::new(base, anon_key)?,
            session,
        })
    }
}

#[async_trait]
impl AuthClient for RestAuthClient {
    async fn get_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.session.borrow().clone())
    }

    async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, StoreError> {
        let mut url = self.endpoint.url(TOKEN_PATH)?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let request = self
            .endpoint
            .request(Method::POST, url, None)
            .json(&json!({ "email": email, "password": password }));

        // Rejected credentials come back as 400 with a readable description.
        let response = match send(request).await {
            Ok(response) => response,
            Err(StoreError::Transient(message)) | Err(StoreError::Auth(message)) => {
                return Err(StoreError::Auth(message));
            }
            Err(other) => return Err(other),
        };
        let token: TokenResponse = read_json(response).await?;

        let session = Session {
            user_id: token.user.id,
            email: token.user.email,
            access_token: token.access_token,
            expires_at: expiry(token.expires_in),
        };
        info!(user_id = %session.user_id, "signed in");
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_provider(&self, provider: &str) -> Result<Url, StoreError> {
        let mut url = self.endpoint.url(AUTHORIZE_PATH)?;
        url.query_pairs_mut().append_pair("provider", provider);
        Ok(url)
    }

    /// The fragment carries `#access_token=...&expires_in=...`.
    async fn complete_provider_sign_in(&self, fragment: &str) -> Result<Session, StoreError> {
        let mut access_token = None;
        let mut expires_in = None;
        for (key, value) in url::form_urlencoded::parse(fragment.trim_start_matches('#').as_bytes()) {
            match key.as_ref() {
                "access_token" => access_token = Some(value.into_owned()),
                "expires_in" => expires_in = value.parse::<i64>().ok(),
                _ => {}
            }
        }
        let access_token =
            access_token.ok_or_else(|| StoreError::auth("redirect did not carry an access token"))?;

        let url = self.endpoint.url(USER_PATH)?;
        let response = send(self.endpoint.request(Method::GET, url, Some(&access_token))).await?;
        let user: UserResponse = read_json(response).await?;

        let session = Session {
            user_id: user.id,
            email: user.email,
            access_token,
            expires_at: expiry(expires_in),
        };
        info!(user_id = %session.user_id, "provider sign-in completed");
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        let token = self
            .session
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone());
        if let Some(token) = token {
            let url = self.endpoint.url(LOGOUT_PATH)?;
            if let Err(err) = send(self.endpoint.request(Method::POST, url, Some(&token))).await {
                warn!(error = %err, "logout request failed; clearing local session");
            }
        }
        self.session.send_replace(None);
        Ok(())
    }

    fn session_changes(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use httpmock::MockServer;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::application::overlay::{CountSource, DetailOverlay, NoopSurface};

    const ANON: &str = "anon-key";

    fn row(id: u64, claps: u64) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Hello",
            "content": "<p>Body</p>",
            "tags": ["rust"],
            "image": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
            "claps": claps
        })
    }

    fn base(server: &MockServer) -> Url {
        Url::parse(&server.base_url()).expect("base url")
    }

    fn store(server: &MockServer) -> RestPostStore {
        let (_tx, rx) = watch::channel(None);
        RestPostStore::new(&base(server), ANON, rx).expect("store")
    }

    #[tokio::test]
    async fn list_orders_by_creation_and_sends_the_anon_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("order", "created_at.desc")
                .header("apikey", ANON)
                .header("authorization", "Bearer anon-key");
            then.status(200).json_body(json!([row(2, 3), row(1, 0)]));
        });

        let posts = store(&server).list_posts().await.expect("list");
        mock.assert();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id.as_str(), "2");
    }

    #[tokio::test]
    async fn empty_row_set_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("id", "eq.9");
            then.status(200).json_body(json!([]));
        });

        let err = store(&server)
            .get_post(&PostId::from("9"))
            .await
            .expect_err("missing");
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn fetch_claps_selects_only_the_counter() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("select", "claps")
                .query_param("id", "eq.4");
            then.status(200).json_body(json!([{ "claps": 7 }]));
        });

        let claps = store(&server)
            .fetch_claps(&PostId::from("4"))
            .await
            .expect("claps");
        mock.assert();
        assert_eq!(claps, 7);
    }

    #[tokio::test]
    async fn update_patches_the_filtered_row() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("PATCH")
                .path("/rest/v1/posts")
                .query_param("id", "eq.4")
                .header("prefer", "return=representation")
                .json_body(json!({ "claps": 8 }));
            then.status(200).json_body(json!([row(4, 8)]));
        });

        store(&server)
            .update_post(&PostId::from("4"), PostPatch::claps(8))
            .await
            .expect("update");
        mock.assert();
    }

    #[tokio::test]
    async fn server_errors_surface_their_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("DELETE").path("/rest/v1/posts");
            then.status(403)
                .json_body(json!({ "message": "permission denied for table posts" }));
        });

        let err = store(&server)
            .delete_post(&PostId::from("1"))
            .await
            .expect_err("forbidden");
        assert_eq!(err.to_string(), "permission denied for table posts");
    }

    #[tokio::test]
    async fn increment_calls_the_configured_function() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/rest/v1/rpc/increment_claps")
                .json_body(json!({ "post_id": "4" }));
            then.status(204);
        });

        let store = store(&server).with_increment_rpc(Some("increment_claps".into()));
        assert!(store.supports_atomic_increment());
        store
            .increment_claps(&PostId::from("4"))
            .await
            .expect("increment");
        mock.assert();
    }

    #[tokio::test]
    async fn sign_in_stores_session_and_authorizes_later_writes() {
        let server = MockServer::start();
        let token_mock = server.mock(|when, then| {
            when.method("POST")
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .json_body(json!({ "email": "a@b.c", "password": "pw" }));
            then.status(200).json_body(json!({
                "access_token": "user-token",
                "expires_in": 3600,
                "user": { "id": "u-1", "email": "a@b.c" }
            }));
        });
        let delete_mock = server.mock(|when, then| {
            when.method("DELETE")
                .path("/rest/v1/posts")
                .header("authorization", "Bearer user-token");
            then.status(200).json_body(json!([row(1, 0)]));
        });

        let auth = RestAuthClient::new(&base(&server), ANON).expect("auth");
        let store = RestPostStore::new(&base(&server), ANON, auth.session_changes()).expect("store");

        let session = auth
            .sign_in_with_credentials("a@b.c", "pw")
            .await
            .expect("sign in");
        assert_eq!(session.email.as_deref(), Some("a@b.c"));
        assert!(session.expires_at.is_some());

        store.delete_post(&PostId::from("1")).await.expect("delete");
        token_mock.assert();
        delete_mock.assert();
    }

    #[tokio::test]
    async fn rejected_credentials_are_auth_errors_with_the_server_text() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/auth/v1/token");
            then.status(400).json_body(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            }));
        });

        let auth = RestAuthClient::new(&base(&server), ANON).expect("auth");
        let err = auth
            .sign_in_with_credentials("a@b.c", "bad")
            .await
            .expect_err("rejected");
        assert!(matches!(err, StoreError::Auth(ref message) if message == "Invalid login credentials"));
        assert!(auth.get_session().await.expect("session").is_none());
    }

    #[tokio::test]
    async fn provider_sign_in_builds_the_authorize_url() {
        let server = MockServer::start();
        let auth = RestAuthClient::new(&base(&server), ANON).expect("auth");
        let url = auth.sign_in_with_provider("github").await.expect("url");
        assert_eq!(url.path(), "/auth/v1/authorize");
        assert_eq!(url.query(), Some("provider=github"));
    }

    #[tokio::test]
    async fn redirect_fragment_completes_the_session() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET")
                .path("/auth/v1/user")
                .header("authorization", "Bearer from-redirect");
            then.status(200)
                .json_body(json!({ "id": "u-9", "email": "octo@example.com" }));
        });

        let auth = RestAuthClient::new(&base(&server), ANON).expect("auth");
        let mut changes = auth.session_changes();
        let session = auth
            .complete_provider_sign_in("#access_token=from-redirect&expires_in=60&token_type=bearer")
            .await
            .expect("session");

        assert_eq!(session.user_id, "u-9");
        assert!(changes.has_changed().expect("sender alive"));
        assert!(changes.borrow_and_update().is_some());
    }

    #[tokio::test]
    async fn polling_subscription_publishes_row_changes() {
        let server = MockServer::start();
        let mut before = server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("id", "eq.4");
            then.status(200).json_body(json!([row(4, 7)]));
        });

        let store = store(&server).with_poll_interval(Duration::from_millis(20));
        let mut subscription = store.subscribe(&PostId::from("4")).await.expect("subscribe");

        let first = timeout(Duration::from_secs(5), subscription.next())
            .await
            .expect("first row within timeout");
        assert!(matches!(first, Some(RowChange::Updated(ref row)) if row.claps == 7));
        sleep(Duration::from_millis(60)).await;

        before.delete();
        server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("id", "eq.4");
            then.status(200).json_body(json!([row(4, 8)]));
        });

        let change = timeout(Duration::from_secs(5), subscription.next())
            .await
            .expect("change within timeout");
        match change {
            Some(RowChange::Updated(row)) => assert_eq!(row.claps, 8),
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[tokio::test]
    async fn overlay_picks_up_a_write_that_landed_after_its_read() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("select", "claps")
                .query_param("id", "eq.4");
            then.status(200).json_body(json!([{ "claps": 7 }]));
        });
        server.mock(|when, then| {
            when.method("GET")
                .path("/rest/v1/posts")
                .query_param("select", "*")
                .query_param("id", "eq.4");
            then.status(200)
                .delay(Duration::from_millis(200))
                .json_body(json!([row(4, 8)]));
        });

        let store = store(&server).with_poll_interval(Duration::from_millis(20));
        let overlay = DetailOverlay::new(Arc::new(store), Arc::new(NoopSurface));
        let snapshot: PostRecord = serde_json::from_value(row(4, 5)).expect("snapshot row");
        overlay.open(&snapshot);

        let mut views = overlay.watch();
        timeout(
            Duration::from_secs(5),
            views.wait_for(|view| {
                view.as_ref()
                    .is_some_and(|view| view.claps == 8 && view.source == CountSource::Live)
            }),
        )
        .await
        .expect("live count within timeout")
        .expect("overlay alive");

        overlay.close().await;
    }
}
