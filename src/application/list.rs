//! Post list: load once, render cards, route card interaction.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::application::error::{AppError, ErrorReport};
use crate::application::filter::{CardTransition, CardView, FilterState, apply_filters, plan_transitions};
use crate::application::repos::PostStore;
use crate::domain::entities::{PostId, PostRecord};

const METRIC_FILTER_PASSES: &str = "claplog_filter_passes_total";

pub const DEFAULT_STAGGER_STEP: Duration = Duration::from_millis(100);

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load posts.";
pub const EMPTY_MESSAGE: &str = "No posts found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Loading,
    Ready,
    /// Terminal for this load; shown in place of the grid.
    Failed { message: String },
    /// Terminal for this load.
    Empty,
}

/// Which part of a card was clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardClick {
    Tag(String),
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListAction {
    /// Filters were re-applied; one transition per card.
    Filtered(Vec<CardTransition>),
    /// The detail overlay should open on this post.
    Open(PostRecord),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBadge {
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardViewModel {
    pub id: PostId,
    pub title: String,
    pub excerpt: String,
    pub date: String,
    pub tags: Vec<TagBadge>,
    pub visible: bool,
    /// Staggered entrance; only present before the first filter pass.
    pub entrance_delay: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListViewModel {
    pub status: ListStatus,
    pub failure_detail: Option<String>,
    pub active_tag: Option<String>,
    pub cards: Vec<CardViewModel>,
}

impl ListViewModel {
    pub fn visible_cards(&self) -> impl Iterator<Item = &CardViewModel> {
        self.cards.iter().filter(|card| card.visible)
    }
}

/// One page load worth of post list state.
///
/// The post snapshot is immutable once loaded; filtering only changes
/// visibility.
#[derive(Debug, Clone)]
pub struct ListView {
    posts: Arc<[PostRecord]>,
    cards: Vec<CardView>,
    filter: FilterState,
    visible: Vec<bool>,
    status: ListStatus,
    failure_detail: Option<String>,
    filtered_once: bool,
    stagger_step: Duration,
}

impl ListView {
    pub fn new(stagger_step: Duration) -> Self {
        Self {
            posts: Arc::from(Vec::new()),
            cards: Vec::new(),
            filter: FilterState::new(),
            visible: Vec::new(),
            status: ListStatus::Loading,
            failure_detail: None,
            filtered_once: false,
            stagger_step,
        }
    }

    pub async fn load(store: &dyn PostStore, stagger_step: Duration) -> Self {
        let result = store.list_posts().await.map_err(AppError::from);
        Self::from_result(result, stagger_step)
    }

    pub fn from_result(result: Result<Vec<PostRecord>, AppError>, stagger_step: Duration) -> Self {
        let mut view = Self::new(stagger_step);
        match result {
            Ok(posts) if posts.is_empty() => {
                view.status = ListStatus::Empty;
            }
            Ok(posts) => {
                debug!(count = posts.len(), "post list loaded");
                view.cards = posts.iter().map(CardView::from_post).collect();
                view.visible = vec![true; posts.len()];
                view.posts = Arc::from(posts);
                view.status = ListStatus::Ready;
            }
            Err(err) => {
                let report = ErrorReport::from_error("application::list::load", &err);
                warn!(
                    source = report.source,
                    error = %report.joined(),
                    "post list failed to load"
                );
                view.failure_detail = Some(err.user_message());
                view.status = ListStatus::Failed {
                    message: LOAD_FAILED_MESSAGE.to_string(),
                };
            }
        }
        view
    }

    pub fn status(&self) -> &ListStatus {
        &self.status
    }

    pub fn posts(&self) -> &Arc<[PostRecord]> {
        &self.posts
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn visibility(&self) -> &[bool] {
        &self.visible
    }

    /// Record typed search text without recomputing.
    ///
    /// Pair with a [`crate::application::debounce::Debouncer`] that calls
    /// [`ListView::refilter`] once typing settles.
    pub fn set_search(&mut self, raw: &str) {
        self.filter.set_search(raw);
    }

    /// Toggle `tag` and re-apply filters immediately.
    pub fn toggle_tag(&mut self, tag: &str) -> Vec<CardTransition> {
        self.filter.toggle_tag(tag);
        self.refilter()
    }

    pub fn refilter(&mut self) -> Vec<CardTransition> {
        let next = apply_filters(&self.cards, &self.filter);
        let transitions = plan_transitions(&self.visible, &next);
        self.visible = next;
        self.filtered_once = true;
        counter!(METRIC_FILTER_PASSES).increment(1);
        transitions
    }

    pub fn click(&mut self, id: &PostId, click: CardClick) -> ListAction {
        let Some(index) = self.cards.iter().position(|card| &card.id == id) else {
            return ListAction::Ignored;
        };

        match click {
            CardClick::Tag(tag) => ListAction::Filtered(self.toggle_tag(&tag)),
            CardClick::Body => ListAction::Open(self.posts[index].clone()),
        }
    }

    pub fn render(&self) -> ListViewModel {
        let active_tag = self.filter.active_tag();
        let cards = self
            .cards
            .iter()
            .zip(&self.visible)
            .enumerate()
            .map(|(index, (card, visible))| CardViewModel {
                id: card.id.clone(),
                title: card.title.clone(),
                excerpt: card.excerpt.clone(),
                date: card.date.clone(),
                tags: card
                    .tags
                    .iter()
                    .map(|tag| TagBadge {
                        label: tag.clone(),
                        active: active_tag == Some(tag.as_str()),
                    })
                    .collect(),
                visible: *visible,
                entrance_delay: (!self.filtered_once).then(|| self.stagger_step * index as u32),
            })
            .collect();

        ListViewModel {
            status: self.status.clone(),
            failure_detail: self.failure_detail.clone(),
            active_tag: active_tag.map(str::to_string),
            cards,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::{ChangeSubscription, StoreError};
    use crate::domain::entities::{PostFields, PostPatch};
    use crate::domain::posts::demo_posts;

    struct ListOnlyStore {
        result: Result<Vec<PostRecord>, &'static str>,
    }

    #[async_trait]
    impl PostStore for ListOnlyStore {
        async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError> {
            self.result.clone().map_err(StoreError::transient)
        }

        async fn get_post(&self, _id: &PostId) -> Result<PostRecord, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn create_post(&self, _fields: PostFields) -> Result<PostRecord, StoreError> {
            unimplemented!("not used")
        }

        async fn update_post(&self, _id: &PostId, _patch: PostPatch) -> Result<(), StoreError> {
            unimplemented!("not used")
        }

        async fn delete_post(&self, _id: &PostId) -> Result<(), StoreError> {
            unimplemented!("not used")
        }

        async fn subscribe(&self, _id: &PostId) -> Result<ChangeSubscription, StoreError> {
            unimplemented!("not used")
        }
    }

    fn ready_view() -> ListView {
        ListView::from_result(Ok(demo_posts()), DEFAULT_STAGGER_STEP)
    }

    #[tokio::test]
    async fn load_renders_one_card_per_post_in_order() {
        let store = ListOnlyStore {
            result: Ok(demo_posts()),
        };
        let view = ListView::load(&store, DEFAULT_STAGGER_STEP).await;
        let model = view.render();

        assert_eq!(model.status, ListStatus::Ready);
        let ids: Vec<_> = model.cards.iter().map(|card| card.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "4", "3", "2", "1"]);
    }

    #[tokio::test]
    async fn load_failure_is_terminal_and_inline() {
        let store = ListOnlyStore {
            result: Err("connection refused"),
        };
        let view = ListView::load(&store, DEFAULT_STAGGER_STEP).await;
        let model = view.render();

        assert_eq!(
            model.status,
            ListStatus::Failed {
                message: LOAD_FAILED_MESSAGE.to_string()
            }
        );
        assert_eq!(model.failure_detail.as_deref(), Some("connection refused"));
        assert!(model.cards.is_empty());
    }

    #[test]
    fn empty_result_is_distinct_from_failure() {
        let view = ListView::from_result(Ok(Vec::new()), DEFAULT_STAGGER_STEP);
        assert_eq!(view.status(), &ListStatus::Empty);
    }

    #[test]
    fn entrance_is_staggered_until_the_first_filter_pass() {
        let mut view = ready_view();
        let delays: Vec<_> = view
            .render()
            .cards
            .iter()
            .map(|card| card.entrance_delay)
            .collect();
        assert_eq!(delays[0], Some(Duration::ZERO));
        assert_eq!(delays[3], Some(Duration::from_millis(300)));

        view.toggle_tag("design");
        view.toggle_tag("design");
        assert!(view.render().cards.iter().all(|card| card.entrance_delay.is_none()));
    }

    #[test]
    fn tag_click_filters_without_opening() {
        let mut view = ready_view();
        let action = view.click(&PostId::from("4"), CardClick::Tag("design".into()));

        assert!(matches!(action, ListAction::Filtered(_)));
        let model = view.render();
        let visible: Vec<_> = model.visible_cards().map(|card| card.id.as_str()).collect();
        assert_eq!(visible, vec!["4", "3"]);
        assert_eq!(model.active_tag.as_deref(), Some("design"));
        assert!(
            model.cards[1]
                .tags
                .iter()
                .any(|badge| badge.label == "design" && badge.active)
        );
    }

    #[test]
    fn body_click_opens_the_full_post() {
        let mut view = ready_view();
        match view.click(&PostId::from("2"), CardClick::Body) {
            ListAction::Open(post) => {
                assert_eq!(post.id.as_str(), "2");
                assert_eq!(post.claps, 21);
            }
            other => panic!("expected open, got {other:?}"),
        }
    }

    #[test]
    fn typed_search_waits_for_refilter_but_tag_toggle_uses_it() {
        let mut view = ready_view();
        view.set_search("COUNTER");
        assert!(view.visibility().iter().all(|visible| *visible));

        view.toggle_tag("realtime");
        let visible: Vec<_> = view
            .render()
            .visible_cards()
            .map(|card| card.id.to_string())
            .collect();
        assert_eq!(visible, vec!["5".to_string()]);
    }

    #[test]
    fn unknown_card_is_ignored() {
        let mut view = ready_view();
        assert_eq!(
            view.click(&PostId::from("missing"), CardClick::Body),
            ListAction::Ignored
        );
    }
}
