//! Post detail overlay with a live applause counter.
//!
//! Opening publishes the snapshot immediately, then races an authoritative
//! read against a change subscription for the same row. Every completion is
//! tagged with the generation that started it and dropped if the overlay has
//! been closed or re-opened since.

mod burst;

use std::sync::{Arc, Mutex};

use futures::future::join_all;
use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::error::AppError;
use crate::application::repos::PostStore;
use crate::domain::entities::{PostId, PostPatch, PostRecord, RowChange};
use crate::domain::posts::format_display_date;
use crate::util::lock::mutex_lock;

pub use burst::{
    BURST_COLORS, BURST_DURATION, BURST_LIFT_PX, BURST_PARTICLES, Burst, Particle,
};

const LOCK_TARGET: &str = "application::overlay";
const METRIC_APPLAUSE_WRITES: &str = "claplog_applause_writes_total";
const METRIC_APPLAUSE_FAILURES: &str = "claplog_applause_write_failures_total";
const METRIC_SUBSCRIPTION_DELIVERIES: &str = "claplog_subscription_deliveries_total";

/// Where the displayed applause count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    /// Copied from the list snapshot; provisional.
    Snapshot,
    /// Fresh read issued when the overlay opened.
    Authoritative,
    /// Pushed by the change subscription.
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    pub post_id: PostId,
    pub title: String,
    pub date: String,
    pub tags: Vec<String>,
    /// Rendered as-is.
    pub content: String,
    pub image: Option<String>,
    pub claps: u64,
    pub source: CountSource,
}

impl OverlayView {
    fn from_snapshot(post: &PostRecord) -> Self {
        Self {
            post_id: post.id.clone(),
            title: post.title.clone(),
            date: format_display_date(post.created_at),
            tags: post.tags.clone(),
            content: post.content.clone(),
            image: post.image.clone(),
            claps: post.claps,
            source: CountSource::Snapshot,
        }
    }

    pub fn claps_label(&self) -> String {
        format!("{} Claps", self.claps)
    }

    /// The count has been confirmed by the store at least once.
    pub fn is_confirmed(&self) -> bool {
        self.source != CountSource::Snapshot
    }
}

/// Side effects the overlay cannot express as view state.
pub trait OverlaySurface: Send + Sync {
    fn burst(&self, burst: &Burst);

    fn set_scroll_locked(&self, locked: bool);
}

/// Surface that drops every effect.
#[derive(Debug, Default)]
pub struct NoopSurface;

impl OverlaySurface for NoopSurface {
    fn burst(&self, _burst: &Burst) {}

    fn set_scroll_locked(&self, _locked: bool) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayInput {
    CloseButton,
    /// Click on the dimmed area outside the content panel.
    Backdrop,
    Escape,
}

#[derive(Debug)]
pub enum ApplaudOutcome {
    /// The store accepted the write; the count follows via the subscription.
    Recorded,
    /// Burst already played; the write did not land.
    Failed(AppError),
    /// Nothing is open.
    Ignored,
}

struct OpenSession {
    generation: u64,
    post_id: PostId,
    tasks: Vec<JoinHandle<()>>,
}

impl OpenSession {
    fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[derive(Default)]
struct OverlayState {
    generation: u64,
    bursts: u64,
    open: Option<OpenSession>,
}

struct Shared {
    store: Arc<dyn PostStore>,
    surface: Arc<dyn OverlaySurface>,
    state: Mutex<OverlayState>,
    view: watch::Sender<Option<OverlayView>>,
}

impl Shared {
    /// Overwrite the displayed count if `generation` is still the open one.
    fn apply_count(&self, generation: u64, claps: u64, source: CountSource) -> bool {
        let state = mutex_lock(&self.state, LOCK_TARGET, "apply_count");
        let current = state.open.as_ref().map(|session| session.generation);
        if current != Some(generation) {
            debug!(generation, ?current, "discarding stale clap count");
            return false;
        }

        self.view.send_modify(|view| {
            if let Some(view) = view.as_mut() {
                view.claps = claps;
                view.source = source;
            }
        });
        true
    }
}

/// Single overlay instance shared by every card of a list.
pub struct DetailOverlay {
    shared: Arc<Shared>,
}

impl DetailOverlay {
    pub fn new(store: Arc<dyn PostStore>, surface: Arc<dyn OverlaySurface>) -> Self {
        let (view, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                store,
                surface,
                state: Mutex::new(OverlayState::default()),
                view,
            }),
        }
    }

    /// Receiver for every published view; `None` while closed.
    pub fn watch(&self) -> watch::Receiver<Option<OverlayView>> {
        self.shared.view.subscribe()
    }

    pub fn current(&self) -> Option<OverlayView> {
        self.shared.view.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        mutex_lock(&self.shared.state, LOCK_TARGET, "is_open")
            .open
            .is_some()
    }

    /// Show `post`, replacing whatever was open.
    ///
    /// Must be called from within a tokio runtime: the authoritative read and
    /// the change subscription run as spawned tasks.
    pub fn open(&self, post: &PostRecord) {
        let mut state = mutex_lock(&self.shared.state, LOCK_TARGET, "open");
        if let Some(previous) = state.open.take() {
            debug!(post_id = %previous.post_id, "replacing open overlay");
            previous.abort();
        }

        state.generation += 1;
        let generation = state.generation;
        let post_id = post.id.clone();

        self.shared
            .view
            .send_replace(Some(OverlayView::from_snapshot(post)));
        self.shared.surface.set_scroll_locked(true);

        let tasks = vec![
            tokio::spawn(refresh_count(
                Arc::clone(&self.shared),
                generation,
                post_id.clone(),
            )),
            tokio::spawn(follow_changes(
                Arc::clone(&self.shared),
                generation,
                post_id.clone(),
            )),
        ];

        info!(post_id = %post_id, generation, "overlay opened");
        state.open = Some(OpenSession {
            generation,
            post_id,
            tasks,
        });
    }

    /// Close and wait until the change subscription has been released.
    pub async fn close(&self) {
        // Publishing happens under the state lock so a concurrent `open`
        // cannot be cleared after it has installed its view.
        let session = {
            let mut state = mutex_lock(&self.shared.state, LOCK_TARGET, "close");
            let Some(session) = state.open.take() else {
                return;
            };
            session.abort();
            self.shared.view.send_replace(None);
            self.shared.surface.set_scroll_locked(false);
            session
        };

        // Cancellation is the expected outcome here.
        join_all(session.tasks).await;
        info!(post_id = %session.post_id, "overlay closed");
    }

    /// Route a close input. Returns whether the overlay closed.
    pub async fn handle_input(&self, input: OverlayInput) -> bool {
        if !self.is_open() {
            return false;
        }
        debug!(?input, "overlay close input");
        self.close().await;
        true
    }

    /// Applaud the open post.
    ///
    /// The burst plays before any store call. The displayed count is never
    /// set from here; the change subscription carries the new value.
    pub async fn applaud(&self) -> ApplaudOutcome {
        let (post_id, burst) = {
            let mut state = mutex_lock(&self.shared.state, LOCK_TARGET, "applaud");
            let Some(post_id) = state.open.as_ref().map(|session| session.post_id.clone()) else {
                return ApplaudOutcome::Ignored;
            };
            state.bursts += 1;
            (post_id, Burst::generate(state.bursts))
        };

        self.shared.surface.burst(&burst);

        match record_applause(self.shared.store.as_ref(), &post_id).await {
            Ok(()) => {
                counter!(METRIC_APPLAUSE_WRITES).increment(1);
                debug!(post_id = %post_id, "applause recorded");
                ApplaudOutcome::Recorded
            }
            Err(err) => {
                counter!(METRIC_APPLAUSE_FAILURES).increment(1);
                warn!(post_id = %post_id, error = %err, "applause write failed");
                ApplaudOutcome::Failed(err)
            }
        }
    }
}

impl Drop for DetailOverlay {
    fn drop(&mut self) {
        let state = mutex_lock(&self.shared.state, LOCK_TARGET, "drop");
        if let Some(session) = state.open.as_ref() {
            session.abort();
        }
    }
}

/// Prefer the store's atomic increment; otherwise read then write `+ 1`.
///
/// The fallback has no compare-and-set, so two concurrent applauds can both
/// read the same value and one increment is lost.
async fn record_applause(store: &dyn PostStore, post_id: &PostId) -> Result<(), AppError> {
    if store.supports_atomic_increment() {
        store.increment_claps(post_id).await?;
        return Ok(());
    }

    let current = store.fetch_claps(post_id).await?;
    store
        .update_post(post_id, PostPatch::claps(current.saturating_add(1)))
        .await?;
    Ok(())
}

async fn refresh_count(shared: Arc<Shared>, generation: u64, post_id: PostId) {
    match shared.store.fetch_claps(&post_id).await {
        Ok(claps) => {
            shared.apply_count(generation, claps, CountSource::Authoritative);
        }
        Err(err) => {
            warn!(
                post_id = %post_id,
                error = %err,
                "authoritative clap read failed; keeping snapshot count"
            );
        }
    }
}

async fn follow_changes(shared: Arc<Shared>, generation: u64, post_id: PostId) {
    let mut subscription = match shared.store.subscribe(&post_id).await {
        Ok(subscription) => subscription,
        Err(err) => {
            warn!(post_id = %post_id, error = %err, "change subscription failed");
            return;
        }
    };

    while let Some(change) = subscription.next().await {
        match change {
            RowChange::Updated(row) if row.id == post_id => {
                counter!(METRIC_SUBSCRIPTION_DELIVERIES).increment(1);
                if !shared.apply_count(generation, row.claps, CountSource::Live) {
                    break;
                }
            }
            RowChange::Updated(row) => {
                debug!(expected = %post_id, received = %row.id, "ignoring change for another row");
            }
            RowChange::Deleted(_) => {
                debug!(post_id = %post_id, "open post was deleted");
            }
        }
    }
}
