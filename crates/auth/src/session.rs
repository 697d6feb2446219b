use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Credential, Principal};

/// Error surfaced to session readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    /// The access token expired and could not be refreshed.
    #[serde(rename = "RefreshAccessTokenError")]
    RefreshAccessToken,
}

impl SessionError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshAccessToken => "RefreshAccessTokenError",
        }
    }
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public view of a credential, safe to hand to UI code and handlers.
///
/// Never carries the refresh token. Built only through [`Session::project`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    principal: Principal,
    access_token: String,
    expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<SessionError>,
}

impl Session {
    pub fn project(credential: &Credential) -> Self {
        Self {
            principal: credential.principal().clone(),
            access_token: credential.access_token().to_owned(),
            expires_at: credential.expires_at(),
            error: credential
                .last_error()
                .map(|_| SessionError::RefreshAccessToken),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn error(&self) -> Option<SessionError> {
        self.error
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::CredentialError;

    fn credential() -> Credential {
        Credential::issue(
            "A1",
            Some("R1".into()),
            Principal::from_email("admin@example.com"),
            Utc::now(),
            Duration::seconds(3600),
        )
        .unwrap()
    }

    #[test]
    fn projection_strips_refresh_token() {
        let json = serde_json::to_string(&Session::project(&credential())).unwrap();
        assert!(!json.contains("R1"));
        assert!(!json.contains("refreshToken"));
        assert!(json.contains("\"accessToken\":\"A1\""));
    }

    #[test]
    fn any_refresh_failure_projects_to_the_same_error() {
        for err in [CredentialError::RefreshRejected, CredentialError::RefreshUnavailable] {
            let session = Session::project(&credential().with_error(err));
            assert_eq!(session.error(), Some(SessionError::RefreshAccessToken));
            let json = serde_json::to_value(&session).unwrap();
            assert_eq!(json["error"], "RefreshAccessTokenError");
        }
    }

    #[test]
    fn healthy_credential_has_no_error_field() {
        let json = serde_json::to_value(Session::project(&credential())).unwrap();
        assert!(json.get("error").is_none());
    }
}
