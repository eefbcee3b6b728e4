use crate::domain::entities::{PostFields, PostId, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::tags::{format_tag_input, parse_tag_input};

pub const SIGN_IN_LABEL: &str = "Sign In with Email";
pub const SIGNING_IN_LABEL: &str = "Signing in...";
pub const PUBLISH_LABEL: &str = "Publish Post";
pub const UPDATE_LABEL: &str = "Update Post";
pub const SAVING_LABEL: &str = "Saving...";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub busy: bool,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn submit_label(&self) -> &'static str {
        if self.busy {
            SIGNING_IN_LABEL
        } else {
            SIGN_IN_LABEL
        }
    }
}

/// Create-or-edit form state, holding the raw text of every input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorForm {
    editing: Option<PostId>,
    pub title: String,
    pub content: String,
    /// Comma separated, as typed.
    pub tags: String,
    /// Cover image URL; blank means none.
    pub image: String,
    pub busy: bool,
    pub error: Option<String>,
}

impl EditorForm {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn for_post(post: &PostRecord) -> Self {
        Self {
            editing: Some(post.id.clone()),
            title: post.title.clone(),
            content: post.content.clone(),
            tags: format_tag_input(&post.tags),
            image: post.image.clone().unwrap_or_default(),
            busy: false,
            error: None,
        }
    }

    pub fn editing(&self) -> Option<&PostId> {
        self.editing.as_ref()
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }

    pub fn heading(&self) -> &'static str {
        if self.is_edit() { "Edit Post" } else { "New Post" }
    }

    pub fn submit_label(&self) -> &'static str {
        match (self.busy, self.is_edit()) {
            (true, _) => SAVING_LABEL,
            (false, true) => UPDATE_LABEL,
            (false, false) => PUBLISH_LABEL,
        }
    }

    /// Parsed and validated field values.
    pub fn to_fields(&self) -> Result<PostFields, DomainError> {
        let image = self.image.trim();
        let fields = PostFields {
            title: self.title.clone(),
            content: self.content.clone(),
            tags: parse_tag_input(&self.tags),
            image: (!image.is_empty()).then(|| image.to_string()),
        };
        fields.validate()?;
        Ok(fields)
    }
}
