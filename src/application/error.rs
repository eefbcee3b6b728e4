use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::repos::StoreError, domain::error::DomainError, infra::error::InfraError};

/// Flattened error chain, kept for logging next to the inline message.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn joined(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("service unavailable: {0}")]
    Transient(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Human-readable text shown inline at the point of failure.
    ///
    /// Auth and store messages are passed through verbatim, the way the
    /// backend phrased them.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Transient(message) | AppError::Auth(message) => message.clone(),
            AppError::NotFound => "This post no longer exists.".to_string(),
            AppError::Validation(message) => message.clone(),
            AppError::Domain(DomainError::MissingField { field }) => {
                format!("Please fill in the {field} field.")
            }
            AppError::Domain(err) => err.to_string(),
            AppError::Infra(_) | AppError::Unexpected(_) => {
                "Unexpected error occurred".to_string()
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Transient(message) => AppError::Transient(message),
            StoreError::NotFound => AppError::NotFound,
            StoreError::Auth(message) => AppError::Auth(message),
            StoreError::Unsupported(operation) => {
                AppError::unexpected(format!("unsupported operation: {operation}"))
            }
            StoreError::Decode(message) => AppError::Transient(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            AppError::from(StoreError::transient("timeout")),
            AppError::Transient(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::auth("Invalid login credentials")),
            AppError::Auth(_)
        ));
        assert!(matches!(AppError::from(StoreError::NotFound), AppError::NotFound));
    }

    #[test]
    fn auth_message_is_passed_through_verbatim() {
        let error = AppError::from(StoreError::auth("Invalid login credentials"));
        assert_eq!(error.user_message(), "Invalid login credentials");
    }

    #[test]
    fn missing_field_names_the_field() {
        let error = AppError::from(DomainError::missing_field("title"));
        assert_eq!(error.user_message(), "Please fill in the title field.");
    }

    #[test]
    fn report_walks_the_source_chain() {
        let error = AppError::from(InfraError::configuration("bad url"));
        let report = ErrorReport::from_error("test", &error);
        assert_eq!(report.messages[0], "backend configuration error: bad url");
    }
}
