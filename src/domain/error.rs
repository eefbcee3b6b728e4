use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("required field `{field}` is empty")]
    MissingField { field: &'static str },
    #[error("cover image `{value}` is not an http(s) URL")]
    InvalidImageUrl { value: String },
}

impl DomainError {
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn invalid_image_url(value: impl Into<String>) -> Self {
        Self::InvalidImageUrl {
            value: value.into(),
        }
    }
}
