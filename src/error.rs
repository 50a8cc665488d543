//! Error taxonomy for the hazard map client.
//!
//! Every failure here is recoverable: a retry, a role change, or a fresh
//! load puts the client back in a consistent state.

use thiserror::Error;

use crate::identity::IdentityError;
use crate::store::StoreError;

pub type HazardResult<T> = Result<T, HazardError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HazardError {
    /// Acting principal lacks the role for this operation, or is stale.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Role is known but strictly insufficient (removal is admin-only).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Deliberately does not say which field was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("validation failed: {0}")]
    Validation(String),

    /// Identity or report backend could not be reached. Nothing was applied.
    #[error("backend unavailable: {0}")]
    StoreUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Status may only advance pending -> in_progress -> completed.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
}

impl HazardError {
    /// Whether retrying the same call unchanged can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::LocationUnavailable(_))
    }

    /// Short message suitable for a popup or status bar.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(_) => "You need to sign in as staff to do that.".to_string(),
            Self::Forbidden(_) => "Only administrators can do that.".to_string(),
            Self::InvalidCredentials => "Invalid identifier or password.".to_string(),
            Self::Validation(msg) => format!("Please check the form: {}", msg),
            Self::StoreUnavailable(_) => "The server could not be reached. Please try again.".to_string(),
            Self::NotFound(_) => "This report no longer exists.".to_string(),
            Self::InvalidTransition(msg) => format!("That change is not allowed: {}", msg),
            Self::LocationUnavailable(msg) => format!("Could not get your location: {}", msg),
        }
    }
}

impl From<StoreError> for HazardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Duplicate(id) => Self::Validation(format!("report {} already exists", id)),
            StoreError::Unavailable(msg) | StoreError::Corrupt(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<IdentityError> for HazardError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => Self::InvalidCredentials,
            IdentityError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}
