//! Common error types for the governance pipeline

use thiserror::Error;

/// Common result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the tos microservices
#[derive(Error, Debug)]
pub enum Error {
    /// Length, range, or scope-consistency violation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Disallowed status change
    ///
    /// The message lists every target reachable from `from` so callers can
    /// show the user what would have been accepted.
    #[error("Cannot transition from {from} to {to}. Valid transitions: {}", format_allowed(.allowed))]
    InvalidStateTransition {
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    /// Caller did not identify itself
    #[error("Unauthenticated: {0}")]
    Unauthorized(String),

    /// Caller identified but not permitted (e.g. not the author)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// LLM, store, or index unreachable
    #[error("Infrastructure unavailable: {0}")]
    Unavailable(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_allowed(allowed: &[String]) -> String {
    if allowed.is_empty() {
        "(none)".to_string()
    } else {
        allowed.join(", ")
    }
}

impl Error {
    /// Build an [`Error::InvalidStateTransition`] from any displayable states
    pub fn invalid_transition<S: std::fmt::Display>(from: S, to: S, allowed: &[S]) -> Self {
        Error::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether this failure is an infrastructure outage rather than a caller mistake
    ///
    /// Background tasks swallow (and log) these; everything else is a bug or bad input.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Error::Unavailable(_) | Error::Database(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_lists_allowed_targets() {
        let err = Error::invalid_transition("draft", "voting", &["research", "archived"]);
        assert_eq!(
            err.to_string(),
            "Cannot transition from draft to voting. Valid transitions: research, archived"
        );
    }

    #[test]
    fn test_invalid_transition_from_terminal_state() {
        let err = Error::invalid_transition::<&str>("archived", "draft", &[]);
        assert!(err.to_string().ends_with("Valid transitions: (none)"));
    }

    #[test]
    fn test_infrastructure_classification() {
        assert!(Error::Unavailable("llm".into()).is_infrastructure());
        assert!(!Error::Validation("title".into()).is_infrastructure());
        assert!(!Error::NotFound("x".into()).is_infrastructure());
    }
}
