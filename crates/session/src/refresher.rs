//! Lazy access-token refresh.

use std::sync::Arc;

use tracing::{info, warn};

use backoffice_auth::{AuthError, Credential, CredentialError, Principal};
use backoffice_core::Clock;

use crate::backend::{AuthBackend, BackendError, RefreshRequest, lifetime};

/// Trades a stale refresh token for a new token pair.
///
/// Only called when a read has observed an expired access token; there is no
/// background timer.
pub struct TokenRefresher {
    backend: Arc<dyn AuthBackend>,
    clock: Arc<dyn Clock>,
}

impl TokenRefresher {
    pub fn new(backend: Arc<dyn AuthBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Refresh `credential`, degrading instead of failing.
    ///
    /// On failure the original credential comes back untouched apart from
    /// `last_error`, so a brief backend outage does not log the operator out.
    pub async fn refresh(&self, credential: Credential) -> Credential {
        match self.try_refresh(&credential).await {
            Ok(fresh) => fresh,
            Err(err) => {
                let kind = match err {
                    AuthError::TransportUnavailable(_) => CredentialError::RefreshUnavailable,
                    _ => CredentialError::RefreshRejected,
                };
                warn!(
                    principal = %credential.principal().id,
                    error = %err,
                    recoverable = kind.is_recoverable(),
                    "token refresh failed"
                );
                credential.with_error(kind)
            }
        }
    }

    /// One refresh call, reported as a tagged result.
    pub async fn try_refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let principal = credential.principal();
        let Some(refresh_token) = credential.refresh_token() else {
            return Err(AuthError::RefreshFailure("no refresh token".into()));
        };
        if principal.email.trim().is_empty() {
            return Err(AuthError::RefreshFailure("principal has no email".into()));
        }

        let request = RefreshRequest {
            email: principal.email.clone(),
            refresh_token: refresh_token.to_string(),
        };
        let response = self.backend.refresh(&request).await.map_err(|err| match err {
            BackendError::Rejected { status, message } => {
                AuthError::RefreshFailure(format!("{status}: {message}"))
            }
            BackendError::Unavailable(msg) | BackendError::Malformed(msg) => {
                AuthError::TransportUnavailable(msg)
            }
        })?;

        let lifetime = lifetime(response.expires_in).ok_or_else(|| {
            AuthError::TransportUnavailable(format!("unusable expiresIn {}", response.expires_in))
        })?;
        let principal = response
            .admin
            .map(Principal::from)
            .unwrap_or_else(|| principal.clone());
        let refresh_token = response
            .refresh_token
            .or_else(|| Some(refresh_token.to_string()));

        let fresh = Credential::issue(
            response.access_token,
            refresh_token,
            principal,
            self.clock.now(),
            lifetime,
        )
        .map_err(|e| AuthError::TransportUnavailable(e.to_string()))?;

        info!(principal = %fresh.principal().id, expires_at = %fresh.expires_at(), "access token refreshed");
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;
    use crate::backend::{BackendUser, HttpAuthBackend, RefreshResponse};
    use crate::testing::{StubBackend, credential, refresh_ok, refused_base_url};
    use backoffice_auth::{Role, Session, SessionError};
    use backoffice_core::ManualClock;

    fn expired() -> (Arc<ManualClock>, Credential) {
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));
        (clock, credential(now - Duration::seconds(3601), 3600))
    }

    #[tokio::test]
    async fn success_issues_new_generation_from_now() {
        let (clock, stale) = expired();
        let refresher = TokenRefresher::new(Arc::new(StubBackend::new()), clock.clone());

        let fresh = refresher.refresh(stale.clone()).await;
        assert_eq!(fresh.access_token(), "A2");
        assert_eq!(fresh.refresh_token(), Some("R2"));
        assert_eq!(fresh.issued_at(), clock.now());
        assert_eq!(fresh.expires_at(), clock.now() + Duration::seconds(3600));
        assert_eq!(fresh.principal(), stale.principal());
        assert!(fresh.last_error().is_none());
        assert!(!fresh.same_generation(&stale));
    }

    #[tokio::test]
    async fn server_supplied_principal_replaces_the_old_one() {
        let (clock, stale) = expired();
        let admin: BackendUser = serde_json::from_value(json!({
            "id": 42, "name": "Root", "email": "admin@example.com", "role": "admin"
        }))
        .unwrap();
        let backend = StubBackend::new().with_refresh(Ok(RefreshResponse {
            admin: Some(admin),
            ..refresh_ok("A2", "R2", 60)
        }));

        let fresh = TokenRefresher::new(Arc::new(backend), clock).refresh(stale).await;
        assert_eq!(fresh.principal().id.as_str(), "42");
        assert!(fresh.principal().has_role(&Role::new("admin")));
    }

    #[tokio::test]
    async fn missing_refresh_token_in_response_keeps_the_old_one() {
        let (clock, stale) = expired();
        let backend = StubBackend::new().with_refresh(Ok(RefreshResponse {
            refresh_token: None,
            ..refresh_ok("A2", "unused", 60)
        }));

        let fresh = TokenRefresher::new(Arc::new(backend), clock).refresh(stale).await;
        assert_eq!(fresh.refresh_token(), Some("R1"));
    }

    #[tokio::test]
    async fn connection_refused_degrades_without_touching_other_fields() {
        let (clock, stale) = expired();
        let backend = HttpAuthBackend::new(refused_base_url().await, StdDuration::from_secs(5)).unwrap();

        let degraded = TokenRefresher::new(Arc::new(backend), clock).refresh(stale.clone()).await;
        assert_eq!(degraded.last_error(), Some(CredentialError::RefreshUnavailable));
        assert_eq!(degraded.clone(), stale.clone().with_error(CredentialError::RefreshUnavailable));

        let session = Session::project(&degraded);
        assert_eq!(session.error(), Some(SessionError::RefreshAccessToken));
        assert_eq!(session.error().unwrap().as_str(), "RefreshAccessTokenError");
    }

    #[tokio::test]
    async fn rejected_refresh_token_is_unrecoverable() {
        let (clock, stale) = expired();
        let backend = StubBackend::new().with_refresh(Err(BackendError::Rejected {
            status: 401,
            message: "refresh token revoked".into(),
        }));

        let degraded = TokenRefresher::new(Arc::new(backend), clock).refresh(stale).await;
        assert_eq!(degraded.last_error(), Some(CredentialError::RefreshRejected));
    }

    #[tokio::test]
    async fn no_refresh_token_means_no_network_call() {
        let now = Utc::now();
        let stale = Credential::issue(
            "A1",
            None,
            Principal::from_email("admin@example.com"),
            now - Duration::seconds(10),
            Duration::seconds(5),
        )
        .unwrap();
        let backend = Arc::new(StubBackend::new());

        let degraded = TokenRefresher::new(backend.clone(), Arc::new(ManualClock::new(now)))
            .refresh(stale)
            .await;
        assert_eq!(degraded.last_error(), Some(CredentialError::RefreshRejected));
        assert_eq!(backend.refresh_count(), 0);
    }

    #[tokio::test]
    async fn zero_lifetime_counts_as_unavailable() {
        let (clock, stale) = expired();
        let backend = StubBackend::new().with_refresh(Ok(refresh_ok("A2", "R2", 0)));
        let degraded = TokenRefresher::new(Arc::new(backend), clock).refresh(stale).await;
        assert_eq!(degraded.last_error(), Some(CredentialError::RefreshUnavailable));
        assert_eq!(degraded.access_token(), "A1");
    }
}
