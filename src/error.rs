// ⚠️ Error kinds for the registry and bingo engine
//
// Domain errors are terminal: callers show them to the user verbatim.
// Persistence errors (Io, Json, Journal) may be transient and are kept apart
// so callers can decide to retry.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, BingoError>;

#[derive(Error, Debug)]
pub enum BingoError {
    /// Entity absent: identity, submission, tile, board file
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate approval of a user or submission
    #[error("Already approved: {0}")]
    AlreadyApproved(String),

    /// Caller already has a verification awaiting review
    #[error("Verification already pending for {username}")]
    AlreadyPending { username: String },

    /// Username claimed by a different caller
    #[error("Username \"{username}\" is already assigned to another account")]
    IdentityConflict { username: String },

    /// Fuzzy matcher found nothing above the acceptance threshold
    #[error("\"{input}\" is not a required item for any tile")]
    NoMatch { input: String },

    /// Unrecognized team token
    #[error("Invalid team: {0}")]
    InvalidTeam(String),

    /// Tile-level submission rule rejected the request
    #[error("{0}")]
    ValidationFailed(String),

    /// Filesystem failure while reading or writing a document
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document could not be encoded or decoded
    #[error("Malformed document {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Audit journal failure
    #[error("Journal error: {0}")]
    Journal(#[from] rusqlite::Error),
}

impl BingoError {
    /// True for terminal, user-facing outcomes; false for persistence failures
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            BingoError::Io { .. } | BingoError::Json { .. } | BingoError::Journal(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BingoError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        BingoError::Json {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_terminal() {
        assert!(BingoError::NotFound("submission sub_1".into()).is_domain());
        assert!(BingoError::NoMatch { input: "x".into() }.is_domain());
        assert!(BingoError::ValidationFailed("Tile already completed".into()).is_domain());
    }

    #[test]
    fn test_persistence_errors_are_not_domain() {
        let err = BingoError::io(
            "/tmp/users.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_domain());
        assert!(err.to_string().contains("/tmp/users.json"));
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = BingoError::ValidationFailed("Tile already completed".into());
        assert_eq!(err.to_string(), "Tile already completed");
    }
}
