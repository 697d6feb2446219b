use thiserror::Error;

use backoffice_core::DomainError;

/// Failure kinds of the sign-in and refresh boundaries.
///
/// Authenticator and refresher report these as values; nothing here is ever
/// retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad credentials. User-correctable, shown inline.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// The refresh token is no longer accepted.
    #[error("refresh failed: {0}")]
    RefreshFailure(String),

    /// The auth backend could not be reached (or timed out).
    #[error("auth backend unavailable: {0}")]
    TransportUnavailable(String),

    /// Malformed input, rejected before any network call.
    #[error("validation failed: {0}")]
    ValidationFailure(String),
}

impl AuthError {
    /// Text suitable for an inline message on the login form.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthFailure(msg) | Self::ValidationFailure(msg) => msg.clone(),
            Self::RefreshFailure(_) => "Your session has expired. Please sign in again.".to_string(),
            Self::TransportUnavailable(_) => {
                "The sign-in service is unavailable. Please try again shortly.".to_string()
            }
        }
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvariantViolation(msg) => {
                Self::ValidationFailure(msg)
            }
        }
    }
}
