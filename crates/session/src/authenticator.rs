//! Email/password sign-in.

use std::sync::Arc;

use tracing::{info, warn};

use backoffice_auth::{AuthError, Credential, Principal};
use backoffice_core::{Clock, DomainError, DomainResult};

use crate::backend::{AuthBackend, BackendError, LoginRequest, lifetime};

const UNEXPECTED_RESPONSE: &str = "unexpected response from auth backend";

/// Exchanges an email/password pair for a credential.
///
/// Exactly one backend call per attempt. Failures are returned, never retried:
/// a wrong password must not turn into a burst of retries.
pub struct Authenticator {
    backend: Arc<dyn AuthBackend>,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    pub fn new(backend: Arc<dyn AuthBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        let request = validate_login_input(email, password)?;

        let response = match self.backend.login(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(email = %request.email, error = %err, "sign-in failed");
                return Err(login_error(err));
            }
        };

        let Some(lifetime) = lifetime(response.expires_in) else {
            warn!(email = %request.email, expires_in = response.expires_in, "sign-in response has no usable lifetime");
            return Err(AuthError::AuthFailure(UNEXPECTED_RESPONSE.into()));
        };

        let principal = response
            .user
            .map(Principal::from)
            .unwrap_or_else(|| Principal::from_email(request.email.clone()));

        let credential = Credential::issue(
            response.access_token,
            response.refresh_token,
            principal,
            self.clock.now(),
            lifetime,
        )
        .map_err(|e| {
            warn!(email = %request.email, error = %e, "sign-in response rejected");
            AuthError::AuthFailure(UNEXPECTED_RESPONSE.into())
        })?;

        info!(
            principal = %credential.principal().id,
            expires_at = %credential.expires_at(),
            "signed in"
        );
        Ok(credential)
    }
}

fn login_error(err: BackendError) -> AuthError {
    match err {
        BackendError::Rejected { message, .. } if !message.is_empty() => AuthError::AuthFailure(message),
        BackendError::Rejected { .. } => AuthError::AuthFailure("invalid email or password".into()),
        BackendError::Unavailable(msg) => AuthError::TransportUnavailable(msg),
        BackendError::Malformed(_) => AuthError::AuthFailure(UNEXPECTED_RESPONSE.into()),
    }
}

/// Reject obviously malformed input before it reaches the network.
fn validate_login_input(email: &str, password: &str) -> DomainResult<LoginRequest> {
    let email = email.trim();
    if email.is_empty() {
        return Err(DomainError::validation("email is required"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {}
        _ => return Err(DomainError::validation("email is not a valid address")),
    }
    if password.is_empty() {
        return Err(DomainError::validation("password is required"));
    }
    Ok(LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    })
}
