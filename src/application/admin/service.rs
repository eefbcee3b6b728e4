use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};
use url::Url;

use crate::application::error::AppError;
use crate::application::repos::{AuthClient, PostStore};
use crate::domain::entities::{PostFields, PostId, PostPatch, PostRecord, Session};
use crate::domain::posts::format_display_date;

use super::forms::{EditorForm, LoginForm};
use super::{Confirm, DELETE_PROMPT, EMPTY_LIST_MESSAGE};

#[derive(Debug, Clone, PartialEq)]
pub enum PostListState {
    Loading,
    Loaded(Vec<PostRecord>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Login(LoginForm),
    List(PostListState),
    Editor(EditorForm),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRow {
    pub id: PostId,
    pub title: String,
    pub date: String,
    pub claps: u64,
    pub tags: Vec<String>,
}

impl AdminRow {
    fn from_post(post: &PostRecord) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            date: format_display_date(post.created_at),
            claps: post.claps,
            tags: post.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardBody {
    Loading,
    /// Inline load failure, already prefixed with `Error:`.
    Failed(String),
    Empty(&'static str),
    Rows(Vec<AdminRow>),
    Editor(EditorForm),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminViewModel {
    Login(LoginForm),
    Dashboard {
        email: Option<String>,
        notice: Option<String>,
        body: DashboardBody,
    },
}

/// A validated save waiting to be sent to the store.
#[derive(Debug, Clone)]
pub struct PendingSave {
    target: Option<PostId>,
    fields: PostFields,
}

impl PendingSave {
    pub async fn execute(self, store: &dyn PostStore) -> Result<(), AppError> {
        match self.target {
            Some(id) => {
                let patch = PostPatch::from_fields(self.fields, OffsetDateTime::now_utc());
                store.update_post(&id, patch).await?;
                info!(post_id = %id, "post updated");
            }
            None => {
                let created = store.create_post(self.fields).await?;
                info!(post_id = %created.id, "post created");
            }
        }
        Ok(())
    }
}

/// Session-gated post management.
///
/// Every write is followed by a fresh list read; nothing is merged locally.
pub struct AdminEditor {
    store: Arc<dyn PostStore>,
    auth: Arc<dyn AuthClient>,
    confirm: Arc<dyn Confirm>,
    session: Option<Session>,
    screen: Screen,
    notice: Option<String>,
}

impl AdminEditor {
    /// Resolve the current session and land on login or the post list.
    pub async fn start(
        store: Arc<dyn PostStore>,
        auth: Arc<dyn AuthClient>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        let session = match auth.get_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "session lookup failed; treating as signed out");
                None
            }
        };

        let mut editor = Self {
            store,
            auth,
            confirm,
            session: None,
            screen: Screen::Login(LoginForm::default()),
            notice: None,
        };
        editor.on_session_change(session).await;
        editor
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Re-evaluate the gate after a sign-in or sign-out anywhere.
    pub async fn on_session_change(&mut self, session: Option<Session>) {
        let was_signed_in = self.session.is_some();
        self.session = session;

        match (&self.session, was_signed_in) {
            (Some(session), false) => {
                debug!(user_id = %session.user_id, "admin session started");
                self.refresh_list().await;
            }
            (Some(_), true) => {}
            (None, _) => {
                if was_signed_in {
                    debug!("admin session ended");
                }
                self.notice = None;
                self.screen = Screen::Login(LoginForm::default());
            }
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), AppError> {
        let Screen::Login(form) = &mut self.screen else {
            return Ok(());
        };
        form.email = email.to_string();
        form.busy = true;
        form.error = None;

        match self.auth.sign_in_with_credentials(email, password).await {
            Ok(session) => {
                self.on_session_change(Some(session)).await;
                Ok(())
            }
            Err(err) => {
                let err = AppError::from(err);
                if let Screen::Login(form) = &mut self.screen {
                    form.busy = false;
                    form.error = Some(err.user_message());
                }
                Err(err)
            }
        }
    }

    /// Start a federated sign-in; the session arrives through
    /// [`AdminEditor::on_session_change`].
    pub async fn sign_in_with_provider(&mut self, provider: &str) -> Result<Url, AppError> {
        match self.auth.sign_in_with_provider(provider).await {
            Ok(url) => Ok(url),
            Err(err) => {
                let err = AppError::from(err);
                if let Screen::Login(form) = &mut self.screen {
                    form.error = Some(err.user_message());
                }
                Err(err)
            }
        }
    }

    /// Finish a federated sign-in from the redirect fragment and open the
    /// dashboard.
    pub async fn complete_provider_sign_in(&mut self, fragment: &str) -> Result<(), AppError> {
        match self.auth.complete_provider_sign_in(fragment).await {
            Ok(session) => {
                self.on_session_change(Some(session)).await;
                Ok(())
            }
            Err(err) => {
                let err = AppError::from(err);
                if let Screen::Login(form) = &mut self.screen {
                    form.error = Some(err.user_message());
                }
                Err(err)
            }
        }
    }

    pub async fn sign_out(&mut self) -> Result<(), AppError> {
        self.auth.sign_out().await?;
        self.on_session_change(None).await;
        Ok(())
    }

    pub async fn refresh_list(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.screen = Screen::List(PostListState::Loading);
        let state = match self.store.list_posts().await {
            Ok(posts) => PostListState::Loaded(posts),
            Err(err) => {
                let err = AppError::from(err);
                warn!(error = %err, "admin post list failed to load");
                PostListState::Failed(err.user_message())
            }
        };
        self.screen = Screen::List(state);
    }

    pub fn new_post(&mut self) {
        if self.session.is_some() {
            self.screen = Screen::Editor(EditorForm::blank());
        }
    }

    /// Open the editor on a post from the loaded list.
    pub fn edit(&mut self, id: &PostId) -> bool {
        let Screen::List(PostListState::Loaded(posts)) = &self.screen else {
            return false;
        };
        let Some(post) = posts.iter().find(|post| &post.id == id) else {
            return false;
        };
        self.screen = Screen::Editor(EditorForm::for_post(post));
        true
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorForm> {
        match &mut self.screen {
            Screen::Editor(form) => Some(form),
            _ => None,
        }
    }

    /// Leave the editor without saving.
    pub async fn back(&mut self) {
        self.refresh_list().await;
    }

    /// Validate the form and mark it busy.
    ///
    /// Validation failures stay on the form and never reach the store.
    pub fn begin_save(&mut self) -> Result<PendingSave, AppError> {
        let Some(form) = self.editor_mut() else {
            return Err(AppError::validation("no post is being edited"));
        };

        match form.to_fields() {
            Ok(fields) => {
                form.busy = true;
                form.error = None;
                Ok(PendingSave {
                    target: form.editing().cloned(),
                    fields,
                })
            }
            Err(err) => {
                let err = AppError::from(err);
                form.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Success returns to a re-fetched list; failure re-enables the form.
    pub async fn finish_save(&mut self, result: Result<(), AppError>) -> Result<(), AppError> {
        match result {
            Ok(()) => {
                self.notice = None;
                self.refresh_list().await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "saving post failed");
                if let Some(form) = self.editor_mut() {
                    form.busy = false;
                    form.error = Some(err.user_message());
                }
                Err(err)
            }
        }
    }

    pub async fn save(&mut self) -> Result<(), AppError> {
        let pending = self.begin_save()?;
        let result = pending.execute(self.store.as_ref()).await;
        self.finish_save(result).await
    }

    /// Delete after confirmation. Returns whether a delete was issued.
    pub async fn delete(&mut self, id: &PostId) -> Result<bool, AppError> {
        if self.session.is_none() {
            return Ok(false);
        }
        if !self.confirm.confirm(DELETE_PROMPT) {
            debug!(post_id = %id, "delete cancelled");
            return Ok(false);
        }

        let result = self.store.delete_post(id).await.map_err(AppError::from);
        self.notice = match &result {
            Ok(()) => {
                info!(post_id = %id, "post deleted");
                None
            }
            Err(err) => {
                warn!(post_id = %id, error = %err, "deleting post failed");
                Some(err.user_message())
            }
        };
        self.refresh_list().await;
        result.map(|()| true)
    }

    pub fn render(&self) -> AdminViewModel {
        let body = match &self.screen {
            Screen::Login(form) => return AdminViewModel::Login(form.clone()),
            Screen::List(PostListState::Loading) => DashboardBody::Loading,
            Screen::List(PostListState::Failed(message)) => {
                DashboardBody::Failed(format!("Error: {message}"))
            }
            Screen::List(PostListState::Loaded(posts)) if posts.is_empty() => {
                DashboardBody::Empty(EMPTY_LIST_MESSAGE)
            }
            Screen::List(PostListState::Loaded(posts)) => {
                DashboardBody::Rows(posts.iter().map(AdminRow::from_post).collect())
            }
            Screen::Editor(form) => DashboardBody::Editor(form.clone()),
        };

        AdminViewModel::Dashboard {
            email: self.session.as_ref().and_then(|session| session.email.clone()),
            notice: self.notice.clone(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::application::admin::forms::{PUBLISH_LABEL, SAVING_LABEL, UPDATE_LABEL};
    use crate::application::repos::{ChangeSubscription, StoreError};
    use crate::infra::memory::{MemoryAuthClient, MemoryPostStore};

    const EMAIL: &str = "admin@example.com";
    const PASSWORD: &str = "hunter2";

    struct CountingConfirm {
        answer: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl CountingConfirm {
        fn answering(answer: bool) -> Arc<Self> {
            Arc::new(Self {
                answer,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl Confirm for CountingConfirm {
        fn confirm(&self, prompt: &str) -> bool {
            self.prompts.lock().expect("prompts").push(prompt.to_string());
            self.answer
        }
    }

    /// Wraps the memory store, counting writes and optionally failing them.
    struct FlakyWriteStore {
        inner: MemoryPostStore,
        writes: AtomicUsize,
        lists: AtomicUsize,
        fail_writes_with: Option<&'static str>,
    }

    impl FlakyWriteStore {
        fn new(inner: MemoryPostStore) -> Self {
            Self {
                inner,
                writes: AtomicUsize::new(0),
                lists: AtomicUsize::new(0),
                fail_writes_with: None,
            }
        }

        fn write_result(&self) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            match self.fail_writes_with {
                Some(message) => Err(StoreError::transient(message)),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl PostStore for FlakyWriteStore {
        async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            self.inner.list_posts().await
        }

        async fn get_post(&self, id: &PostId) -> Result<PostRecord, StoreError> {
            self.inner.get_post(id).await
        }

        async fn create_post(&self, fields: PostFields) -> Result<PostRecord, StoreError> {
            self.write_result()?;
            self.inner.create_post(fields).await
        }

        async fn update_post(&self, id: &PostId, patch: PostPatch) -> Result<(), StoreError> {
            self.write_result()?;
            self.inner.update_post(id, patch).await
        }

        async fn delete_post(&self, id: &PostId) -> Result<(), StoreError> {
            self.write_result()?;
            self.inner.delete_post(id).await
        }

        async fn subscribe(&self, id: &PostId) -> Result<ChangeSubscription, StoreError> {
            self.inner.subscribe(id).await
        }
    }

    fn auth() -> Arc<MemoryAuthClient> {
        Arc::new(MemoryAuthClient::new([(EMAIL.to_string(), PASSWORD.to_string())]))
    }

    async fn signed_in(store: Arc<dyn PostStore>, confirm: Arc<dyn Confirm>) -> AdminEditor {
        let mut editor = AdminEditor::start(store, auth(), confirm).await;
        editor.sign_in(EMAIL, PASSWORD).await.expect("sign in");
        editor
    }

    fn row_ids(editor: &AdminEditor) -> Vec<String> {
        match editor.render() {
            AdminViewModel::Dashboard {
                body: DashboardBody::Rows(rows),
                ..
            } => rows.iter().map(|row| row.id.to_string()).collect(),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn signed_out_admin_lands_on_login() {
        let editor = AdminEditor::start(
            Arc::new(MemoryPostStore::seeded()),
            auth(),
            CountingConfirm::answering(true),
        )
        .await;

        assert!(matches!(editor.render(), AdminViewModel::Login(_)));
    }

    #[tokio::test]
    async fn failed_sign_in_shows_the_message_verbatim_and_re_enables() {
        let mut editor = AdminEditor::start(
            Arc::new(MemoryPostStore::seeded()),
            auth(),
            CountingConfirm::answering(true),
        )
        .await;

        let err = editor.sign_in(EMAIL, "nope").await.expect_err("rejected");
        assert!(matches!(err, AppError::Auth(_)));
        match editor.render() {
            AdminViewModel::Login(form) => {
                assert!(!form.busy);
                assert_eq!(form.error.as_deref(), Some("Invalid login credentials"));
                assert_eq!(form.email, EMAIL);
            }
            other => panic!("expected login, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sign_in_shows_dashboard_with_email_and_rows() {
        let editor = signed_in(
            Arc::new(MemoryPostStore::seeded()),
            CountingConfirm::answering(true),
        )
        .await;

        match editor.render() {
            AdminViewModel::Dashboard { email, .. } => assert_eq!(email.as_deref(), Some(EMAIL)),
            other => panic!("expected dashboard, got {other:?}"),
        }
        assert_eq!(row_ids(&editor), vec!["5", "4", "3", "2", "1"]);
    }

    #[tokio::test]
    async fn sign_out_returns_to_login() {
        let mut editor = signed_in(
            Arc::new(MemoryPostStore::seeded()),
            CountingConfirm::answering(true),
        )
        .await;

        editor.sign_out().await.expect("sign out");
        assert!(editor.session().is_none());
        assert!(matches!(editor.screen(), Screen::Login(_)));
    }

    #[tokio::test]
    async fn empty_and_failed_lists_render_inline_messages() {
        let store = Arc::new(MemoryPostStore::new());
        let mut editor = signed_in(store.clone(), CountingConfirm::answering(true)).await;
        assert!(matches!(
            editor.render(),
            AdminViewModel::Dashboard {
                body: DashboardBody::Empty("No posts yet. Write your first one!"),
                ..
            }
        ));

        store.set_offline(true);
        editor.refresh_list().await;
        match editor.render() {
            AdminViewModel::Dashboard {
                body: DashboardBody::Failed(message),
                ..
            } => assert_eq!(message, "Error: post store offline"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn confirmed_delete_refetches_without_the_post() {
        let confirm = CountingConfirm::answering(true);
        let store = Arc::new(FlakyWriteStore::new(MemoryPostStore::seeded()));
        let mut editor = signed_in(store.clone(), confirm.clone()).await;
        let lists_before = store.lists.load(Ordering::SeqCst);

        assert!(editor.delete(&PostId::from("3")).await.expect("delete"));

        assert_eq!(
            *confirm.prompts.lock().expect("prompts"),
            vec![DELETE_PROMPT.to_string()]
        );
        assert_eq!(store.lists.load(Ordering::SeqCst), lists_before + 1);
        assert_eq!(row_ids(&editor), vec!["5", "4", "2", "1"]);
    }

    #[tokio::test]
    async fn declined_delete_issues_no_call() {
        let store = Arc::new(FlakyWriteStore::new(MemoryPostStore::seeded()));
        let mut editor = signed_in(store.clone(), CountingConfirm::answering(false)).await;

        assert!(!editor.delete(&PostId::from("3")).await.expect("cancelled"));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(row_ids(&editor).len(), 5);
    }

    #[tokio::test]
    async fn publishing_creates_with_zero_claps_and_returns_to_list() {
        let store = Arc::new(MemoryPostStore::seeded());
        let mut editor = signed_in(store.clone(), CountingConfirm::answering(true)).await;

        editor.new_post();
        let form = editor.editor_mut().expect("editor");
        form.title = "Fresh".into();
        form.content = "<p>New</p>".into();
        form.tags = "rust, ,web".into();

        editor.save().await.expect("saved");

        let posts = store.list_posts().await.expect("list");
        let created = &posts[0];
        assert_eq!(created.title, "Fresh");
        assert_eq!(created.tags, vec!["rust", "web"]);
        assert_eq!(created.claps, 0);
        assert_eq!(row_ids(&editor)[0], created.id.to_string());
    }

    #[tokio::test]
    async fn update_keeps_claps_and_bumps_updated_at() {
        let store = Arc::new(MemoryPostStore::seeded());
        let mut editor = signed_in(store.clone(), CountingConfirm::answering(true)).await;
        let id = PostId::from("2");
        let before = store.get_post(&id).await.expect("post");

        assert!(editor.edit(&id));
        editor.editor_mut().expect("editor").title = "Lost updates, revisited".into();
        editor.save().await.expect("saved");

        let after = store.get_post(&id).await.expect("post");
        assert_eq!(after.title, "Lost updates, revisited");
        assert_eq!(after.claps, before.claps);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn busy_label_shows_while_saving_and_failure_restores_it() {
        let mut flaky = FlakyWriteStore::new(MemoryPostStore::seeded());
        flaky.fail_writes_with = Some("duplicate key value");
        let store = Arc::new(flaky);
        let mut editor = signed_in(store.clone(), CountingConfirm::answering(true)).await;

        assert!(editor.edit(&PostId::from("4")));
        let pending = editor.begin_save().expect("valid form");
        assert_eq!(editor.editor_mut().expect("editor").submit_label(), SAVING_LABEL);

        let result = pending.execute(store.as_ref()).await;
        let err = editor.finish_save(result).await.expect_err("write failed");
        assert!(err.is_transient());

        let form = editor.editor_mut().expect("still editing");
        assert!(!form.busy);
        assert_eq!(form.submit_label(), UPDATE_LABEL);
        assert_eq!(form.error.as_deref(), Some("duplicate key value"));
    }

    #[tokio::test]
    async fn missing_title_never_reaches_the_store() {
        let store = Arc::new(FlakyWriteStore::new(MemoryPostStore::seeded()));
        let mut editor = signed_in(store.clone(), CountingConfirm::answering(true)).await;

        editor.new_post();
        editor.editor_mut().expect("editor").content = "body only".into();
        let err = editor.save().await.expect_err("invalid");

        assert!(matches!(err, AppError::Domain(_)));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        let form = editor.editor_mut().expect("editor");
        assert_eq!(form.submit_label(), PUBLISH_LABEL);
        assert_eq!(form.error.as_deref(), Some("Please fill in the title field."));
    }

    #[tokio::test]
    async fn updating_a_vanished_post_keeps_the_form_open() {
        let store = Arc::new(MemoryPostStore::seeded());
        let mut editor = signed_in(store.clone(), CountingConfirm::answering(true)).await;
        let id = PostId::from("1");

        assert!(editor.edit(&id));
        store.delete_post(&id).await.expect("deleted elsewhere");
        let err = editor.save().await.expect_err("gone");

        assert!(matches!(err, AppError::NotFound));
        let form = editor.editor_mut().expect("editor");
        assert_eq!(form.error.as_deref(), Some("This post no longer exists."));
    }

    #[tokio::test]
    async fn session_changes_gate_the_dashboard() {
        let store: Arc<dyn PostStore> = Arc::new(MemoryPostStore::seeded());
        let auth = auth();
        let mut editor =
            AdminEditor::start(store, auth.clone(), CountingConfirm::answering(true)).await;

        let session = auth
            .complete_provider_sign_in("#email=octo%40example.com")
            .await
            .expect("provider session");
        editor.on_session_change(Some(session)).await;
        assert_eq!(row_ids(&editor).len(), 5);

        editor.on_session_change(None).await;
        assert!(matches!(editor.render(), AdminViewModel::Login(_)));
        editor.new_post();
        assert!(editor.editor_mut().is_none());
    }

    #[tokio::test]
    async fn provider_redirect_completes_into_the_dashboard() {
        let mut editor = AdminEditor::start(
            Arc::new(MemoryPostStore::seeded()),
            auth(),
            CountingConfirm::answering(true),
        )
        .await;

        let url = editor.sign_in_with_provider("github").await.expect("url");
        assert_eq!(url.query(), Some("provider=github"));

        editor
            .complete_provider_sign_in("#email=octo%40example.com")
            .await
            .expect("completed");
        assert_eq!(row_ids(&editor).len(), 5);
    }

    #[tokio::test]
    async fn bad_provider_redirect_stays_on_login_with_the_error() {
        let mut editor = AdminEditor::start(
            Arc::new(MemoryPostStore::seeded()),
            auth(),
            CountingConfirm::answering(true),
        )
        .await;

        let err = editor
            .complete_provider_sign_in("#state=xyz")
            .await
            .expect_err("rejected");
        assert!(matches!(err, AppError::Auth(_)));
        match editor.render() {
            AdminViewModel::Login(form) => {
                assert_eq!(form.error.as_deref(), Some("redirect did not name an account"));
            }
            other => panic!("expected login, got {other:?}"),
        }
    }
}
