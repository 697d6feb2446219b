use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use backoffice_core::{DomainError, DomainResult};

use crate::Principal;

/// Why the last refresh attempt left a credential un-refreshed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialError {
    /// The backend refused the refresh token; only a new sign-in helps.
    #[error("refresh token rejected")]
    RefreshRejected,

    /// The backend could not be reached (or answered garbage); the next read retries.
    #[error("auth backend unavailable during refresh")]
    RefreshUnavailable,
}

impl CredentialError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RefreshUnavailable)
    }
}

/// The stored session record: token pair, expiry and the principal it belongs to.
///
/// A credential only exists after a successful sign-in; "not signed in" is
/// modeled as the absence of a credential. Once built, the only mutation is
/// recording a failed refresh via [`Credential::with_error`]; a successful
/// refresh produces a brand new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    principal: Principal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error: Option<CredentialError>,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        principal: Principal,
    ) -> DomainResult<Self> {
        let credential = Self {
            access_token: access_token.into(),
            refresh_token,
            issued_at,
            expires_at,
            principal,
            last_error: None,
        };
        credential.validate()?;
        Ok(credential)
    }

    /// Build a credential issued at `now` that lives for `lifetime`.
    pub fn issue(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        principal: Principal,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> DomainResult<Self> {
        Self::new(access_token, refresh_token, now, now + lifetime, principal)
    }

    /// Check the record invariants.
    ///
    /// Values that come back from outside the process (e.g. a decoded cookie)
    /// must pass this before use.
    pub fn validate(&self) -> DomainResult<()> {
        if self.access_token.trim().is_empty() {
            return Err(DomainError::invariant("access token is empty"));
        }
        if self.expires_at <= self.issued_at {
            return Err(DomainError::invariant("expires_at <= issued_at"));
        }
        Ok(())
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn last_error(&self) -> Option<CredentialError> {
        self.last_error
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Same record with `error` noted; every other field is untouched.
    pub fn with_error(mut self, error: CredentialError) -> Self {
        self.last_error = Some(error);
        self
    }

    /// Whether both values belong to the same token generation.
    pub fn same_generation(&self, other: &Credential) -> bool {
        self.access_token == other.access_token
    }
}
