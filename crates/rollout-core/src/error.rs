//! Error types and result aliases for rollout primitives.
//!
//! Errors are structured for programmatic handling and include enough
//! context to be logged as-is by the maintainers.

use std::fmt;

/// The result type used throughout rollout-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when building or validating rollout primitives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// A version string could not be parsed.
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A collaborator returned a list that violates its documented ordering.
    #[error("ordering violation in {collection}: {message}")]
    OrderingViolation {
        /// The collection whose order was violated.
        collection: &'static str,
        /// Description of the offending entries.
        message: String,
    },

    /// The requested resource was not found.
    #[error("not found: {resource_type} with id {id}")]
    ResourceNotFound {
        /// The type of resource that was not found.
        resource_type: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Creates a new invalid version error.
    #[must_use]
    pub fn invalid_version(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new ordering violation error.
    #[must_use]
    pub fn ordering(collection: &'static str, message: impl Into<String>) -> Self {
        Self::OrderingViolation {
            collection,
            message: message.into(),
        }
    }

    /// Creates a new resource not found error.
    #[must_use]
    pub fn resource_not_found(resource_type: &'static str, id: impl fmt::Display) -> Self {
        Self::ResourceNotFound {
            resource_type,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_version_display() {
        let err = Error::invalid_version("7.x", "component 'x' is not a number");
        let msg = err.to_string();
        assert!(msg.contains("7.x"));
        assert!(msg.contains("not a number"));
    }

    #[test]
    fn ordering_violation_display() {
        let err = Error::ordering("run history", "run 2 starts after run 1");
        assert_eq!(
            err.to_string(),
            "ordering violation in run history: run 2 starts after run 1"
        );
    }

    #[test]
    fn not_found_display() {
        let err = Error::resource_not_found("application", "acme:search");
        assert!(err.to_string().contains("acme:search"));
    }
}
