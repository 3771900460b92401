//! Error types for Quarry Codex.

use thiserror::Error;

/// Result type alias using Quarry Codex's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Quarry Codex operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage collaborator could not be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Strand not found
    #[error("Strand not found: {0}")]
    StrandNotFound(uuid::Uuid),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_unavailable() {
        let err = Error::Unavailable("pool closed".to_string());
        assert_eq!(err.to_string(), "Storage unavailable: pool closed");
    }

    #[test]
    fn test_error_display_strand_not_found() {
        let id = Uuid::nil();
        let err = Error::StrandNotFound(id);
        assert_eq!(err.to_string(), format!("Strand not found: {}", id));
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("empty path".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty path");
    }

    #[test]
    fn test_error_display_job() {
        let err = Error::Job("relation \"move_job\" does not exist".to_string());
        assert!(err.to_string().starts_with("Job error:"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_sqlx_error() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().starts_with("Database error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
