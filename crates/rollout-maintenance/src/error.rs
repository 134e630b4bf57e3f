//! Error types for the maintenance domain.

/// The result type used throughout rollout-maintenance.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while maintaining the fleet.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A collaborator could not be reached or failed to answer.
    #[error("{collaborator} unavailable: {message}")]
    Unavailable {
        /// Which collaborator failed (fleet, ledger, run history, ...).
        collaborator: &'static str,
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A change was requested that the application cannot make right now.
    #[error("invalid state transition for {application}: {reason}")]
    InvalidTransition {
        /// The application the change was requested for.
        application: String,
        /// Why the transition is invalid.
        reason: String,
    },

    /// Configuration was missing or out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the problem.
        message: String,
    },

    /// An error from rollout-core.
    #[error("core error: {0}")]
    Core(#[from] rollout_core::Error),
}

impl Error {
    /// Creates a new unavailable-collaborator error.
    #[must_use]
    pub fn unavailable(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new unavailable-collaborator error with a source.
    #[must_use]
    pub fn unavailable_with_source(
        collaborator: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unavailable {
            collaborator,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new invalid transition error.
    #[must_use]
    pub fn invalid_transition(
        application: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            application: application.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a new invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}
