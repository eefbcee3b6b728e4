//! Authenticated post management: login, post list, editor.

pub mod forms;
pub mod service;

pub use forms::{EditorForm, LoginForm};
pub use service::{
    AdminEditor, AdminRow, AdminViewModel, DashboardBody, PendingSave, PostListState, Screen,
};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this post?";
pub const EMPTY_LIST_MESSAGE: &str = "No posts yet. Write your first one!";

/// Top-level view selected by the location fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Blog,
    Admin,
}

impl Route {
    /// `#admin` selects the admin view; anything else is the blog.
    pub fn from_fragment(fragment: &str) -> Self {
        match fragment.strip_prefix('#').unwrap_or(fragment) {
            "admin" => Route::Admin,
            _ => Route::Blog,
        }
    }
}

/// Yes/no prompt shown before destructive actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}
