//! Tag and free-text filtering over the rendered card set.
//!
//! Everything here is pure: the list view owns a [`FilterState`], re-runs
//! [`apply_filters`] after every state change and hands the before/after
//! visibility to [`plan_transitions`] to drive presentation.

use crate::domain::entities::{PostId, PostRecord};
use crate::domain::posts::{excerpt_for, format_display_date};

/// The filterable face of one post card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: PostId,
    pub title: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub date: String,
}

impl CardView {
    pub fn from_post(post: &PostRecord) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            excerpt: excerpt_for(post),
            tags: post.tags.clone(),
            date: format_display_date(post.created_at),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }
}

/// Selected tag plus search text, owned by one list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    active_tag: Option<String>,
    search_query: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tag(&self) -> Option<&str> {
        self.active_tag.as_deref()
    }

    /// Lowercased search text.
    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Select `tag`, or clear the selection when `tag` is already active.
    ///
    /// Returns the tag that is active afterwards.
    pub fn toggle_tag(&mut self, tag: &str) -> Option<&str> {
        if self.active_tag.as_deref() == Some(tag) {
            self.active_tag = None;
        } else {
            self.active_tag = Some(tag.to_string());
        }
        self.active_tag.as_deref()
    }

    pub fn set_search(&mut self, raw: &str) {
        self.search_query = raw.to_lowercase();
    }

    pub fn is_unfiltered(&self) -> bool {
        self.active_tag.is_none() && self.search_query.is_empty()
    }

    pub fn matches(&self, card: &CardView) -> bool {
        let matches_tag = match self.active_tag.as_deref() {
            None => true,
            Some(tag) => card.has_tag(tag),
        };
        let matches_search = self.search_query.is_empty()
            || card.title.to_lowercase().contains(&self.search_query)
            || card.excerpt.to_lowercase().contains(&self.search_query);

        matches_tag && matches_search
    }
}

/// Visibility of every card under `state`, index-aligned with `cards`.
pub fn apply_filters(cards: &[CardView], state: &FilterState) -> Vec<bool> {
    cards.iter().map(|card| state.matches(card)).collect()
}

/// How one card should animate between two filter passes.
///
/// Slots are positions among the visible cards, i.e. layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTransition {
    /// Newly visible: fade/scale in.
    Enter { slot: usize },
    /// Newly hidden: fade/scale out and leave the layout flow.
    Exit { from: usize },
    /// Still visible but reflowed: animate from the old slot to the new one.
    Move { from: usize, to: usize },
    /// Still visible in the same slot.
    Stay { slot: usize },
    /// Hidden before and after.
    Hidden,
}

impl CardTransition {
    pub fn is_visible_after(self) -> bool {
        matches!(
            self,
            CardTransition::Enter { .. } | CardTransition::Move { .. } | CardTransition::Stay { .. }
        )
    }
}

/// Compare two visibility vectors of equal length.
pub fn plan_transitions(before: &[bool], after: &[bool]) -> Vec<CardTransition> {
    debug_assert_eq!(before.len(), after.len());

    let before_slots = slots(before);
    let after_slots = slots(after);

    before_slots
        .into_iter()
        .zip(after_slots)
        .map(|(was, now)| match (was, now) {
            (None, None) => CardTransition::Hidden,
            (None, Some(slot)) => CardTransition::Enter { slot },
            (Some(from), None) => CardTransition::Exit { from },
            (Some(from), Some(to)) if from == to => CardTransition::Stay { slot: to },
            (Some(from), Some(to)) => CardTransition::Move { from, to },
        })
        .collect()
}

fn slots(visible: &[bool]) -> Vec<Option<usize>> {
    let mut next = 0;
    visible
        .iter()
        .map(|&shown| {
            shown.then(|| {
                let slot = next;
                next += 1;
                slot
            })
        })
        .collect()
}
