//! Domain entities mirrored from the hosted post store.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::domain::error::DomainError;

/// Opaque post identifier.
///
/// Backends hand out either integer or textual keys; both are kept as text so
/// the rest of the crate never has to care which one it is talking to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PostId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(value) => PostId(value.to_string()),
            RawId::Text(value) => PostId(value),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, deserialize_with = "deserialize_claps")]
    pub claps: u64,
}

// `claps` is nullable on older rows.
fn deserialize_claps<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Fields supplied when creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl PostFields {
    /// Reject blank required fields before anything reaches the store.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::missing_field("title"));
        }
        if self.content.trim().is_empty() {
            return Err(DomainError::missing_field("content"));
        }
        if let Some(image) = &self.image {
            let valid = Url::parse(image)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(DomainError::invalid_image_url(image.as_str()));
            }
        }
        Ok(())
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claps: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

impl PostPatch {
    pub fn claps(value: u64) -> Self {
        Self {
            claps: Some(value),
            ..Self::default()
        }
    }

    /// Full content replacement as issued by the admin editor.
    pub fn from_fields(fields: PostFields, updated_at: OffsetDateTime) -> Self {
        Self {
            title: Some(fields.title),
            content: Some(fields.content),
            tags: Some(fields.tags),
            image: Some(fields.image),
            claps: None,
            updated_at: Some(updated_at),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the patch onto a stored record.
    pub fn apply_to(&self, record: &mut PostRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(content) = &self.content {
            record.content = content.clone();
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        if let Some(image) = &self.image {
            record.image = image.clone();
        }
        if let Some(claps) = self.claps {
            record.claps = claps;
        }
        if let Some(updated_at) = self.updated_at {
            record.updated_at = updated_at;
        }
    }
}

/// A row-level change delivered by a change subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange {
    Updated(PostRecord),
    Deleted(PostId),
}

impl RowChange {
    pub fn post_id(&self) -> &PostId {
        match self {
            RowChange::Updated(record) => &record.id,
            RowChange::Deleted(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
    pub expires_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_accepts_integer_and_text_keys() {
        let numeric: PostId = serde_json::from_str("42").expect("numeric id");
        let textual: PostId = serde_json::from_str("\"a1b2\"").expect("text id");
        assert_eq!(numeric.as_str(), "42");
        assert_eq!(textual.as_str(), "a1b2");
    }

    #[test]
    fn record_defaults_missing_claps_and_tags() {
        let json = r#"{
            "id": 7,
            "title": "Hello",
            "content": "<p>Body</p>",
            "created_at": "2024-03-01T10:00:00+00:00",
            "updated_at": "2024-03-01T10:00:00+00:00",
            "claps": null
        }"#;
        let record: PostRecord = serde_json::from_str(json).expect("record");
        assert_eq!(record.claps, 0);
        assert!(record.tags.is_empty());
        assert_eq!(record.image, None);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let value = serde_json::to_value(PostPatch::claps(8)).expect("patch json");
        assert_eq!(value, serde_json::json!({ "claps": 8 }));
    }

    #[test]
    fn clearing_image_serializes_null() {
        let patch = PostPatch {
            image: Some(None),
            ..PostPatch::default()
        };
        let value = serde_json::to_value(patch).expect("patch json");
        assert_eq!(value, serde_json::json!({ "image": null }));
    }

    #[test]
    fn fields_require_title_and_content() {
        let mut fields = PostFields {
            title: "  ".into(),
            content: "body".into(),
            tags: Vec::new(),
            image: None,
        };
        assert!(matches!(
            fields.validate(),
            Err(DomainError::MissingField { field: "title" })
        ));

        fields.title = "Title".into();
        fields.content = String::new();
        assert!(matches!(
            fields.validate(),
            Err(DomainError::MissingField { field: "content" })
        ));
    }

    #[test]
    fn cover_image_must_be_a_web_url() {
        let mut fields = PostFields {
            title: "Title".into(),
            content: "body".into(),
            tags: Vec::new(),
            image: Some("not a url".into()),
        };
        assert!(matches!(
            fields.validate(),
            Err(DomainError::InvalidImageUrl { .. })
        ));

        fields.image = Some("javascript:alert(1)".into());
        assert!(fields.validate().is_err());

        fields.image = Some("https://images.example.com/cover.png".into());
        assert_eq!(fields.validate(), Ok(()));
    }
}
