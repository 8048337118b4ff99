//! Error types for the synchronization core and its collaborators.

use thiserror::Error;

use crate::trello::EntityKind;

/// All errors surfaced by trello-sync operations.
#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid value for '{property}': {reason}")]
  Validation { property: String, reason: String },

  #[error("property '{0}' is managed by the server and cannot be written")]
  ReadOnlyProperty(String),

  #[error("unknown property '{property}' on {kind}")]
  UnknownProperty { kind: EntityKind, property: String },

  #[error("{kind} {id} not found")]
  NotFound { kind: EntityKind, id: String },

  #[error("request failed with status {status}: {message}")]
  Transport { status: u16, message: String },

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("session is read-only\n  hint: set TRELLO_SYNC_TOKEN to enable writes")]
  ReadOnly,

  #[error("{operation} is not supported for {kind}")]
  Unsupported {
    kind: EntityKind,
    operation: &'static str,
  },

  #[error("request was cancelled before it completed")]
  Cancelled,

  #[error("unexpected payload: {0}")]
  UnexpectedPayload(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("invalid url: {0}")]
  Url(#[from] url::ParseError),
}

impl Error {
  /// Whether the error means the remote object does not exist.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::NotFound { .. })
  }

  pub(crate) fn validation(property: &str, reason: impl Into<String>) -> Self {
    Error::Validation {
      property: property.to_string(),
      reason: reason.into(),
    }
  }
}

/// A specialized Result type for trello-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validation_message_names_property() {
    let err = Error::validation("name", "must not be null");
    assert_eq!(err.to_string(), "invalid value for 'name': must not be null");
  }

  #[test]
  fn test_not_found_is_detected() {
    let err = Error::NotFound {
      kind: EntityKind::Card,
      id: "abc".to_string(),
    };
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "card abc not found");
    assert!(!Error::ReadOnly.is_not_found());
  }
}
