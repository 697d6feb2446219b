//! Contract with the remote auth backend, plus its HTTP implementation.
//!
//! Endpoints (relative to the configured base):
//! - `POST /login {email, password}` → `{accessToken, refreshToken, user?, expiresIn}`
//! - `POST /refresh-token {email, refreshToken}` → `{accessToken, refreshToken?, admin?, expiresIn}`
//! - `POST /logout {email, refreshToken?}` → body ignored

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use backoffice_auth::{Credential, Permission, Principal, PrincipalId, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Connection refused, timeout, or a 5xx answer.
    #[error("auth backend unavailable: {0}")]
    Unavailable(String),

    /// The backend understood the request and said no.
    #[error("auth backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// 2xx answer whose body does not have the expected shape.
    #[error("malformed auth backend response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub email: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutRequest {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl SignOutRequest {
    pub fn for_credential(credential: &Credential) -> Self {
        Self {
            email: credential.principal().email.clone(),
            refresh_token: credential.refresh_token().map(str::to_owned),
        }
    }
}

/// Backend ids show up both as JSON numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum BackendId {
    Number(i64),
    Text(String),
}

/// User object as sent by the backend (`user` on login, `admin` on refresh).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendUser {
    id: BackendId,
    #[serde(default)]
    name: Option<String>,
    email: String,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    permissions: Vec<Permission>,
}

impl From<BackendUser> for Principal {
    fn from(user: BackendUser) -> Self {
        let id = match user.id {
            BackendId::Number(n) => PrincipalId::new(n.to_string()),
            BackendId::Text(s) => PrincipalId::new(s),
        };
        Self {
            id,
            name: user.name.unwrap_or_else(|| user.email.clone()),
            email: user.email,
            role: user.role,
            permissions: user.permissions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<BackendUser>,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub admin: Option<BackendUser>,
    pub expires_in: u64,
}

/// Server-declared lifetime as a positive duration.
pub(crate) fn lifetime(expires_in: u64) -> Option<Duration> {
    if expires_in == 0 {
        return None;
    }
    i64::try_from(expires_in).ok().and_then(Duration::try_seconds)
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, BackendError>;

    async fn refresh(&self, request: &RefreshRequest) -> Result<RefreshResponse, BackendError>;

    async fn sign_out(&self, request: &SignOutRequest) -> Result<(), BackendError>;
}

/// reqwest-backed [`AuthBackend`].
///
/// The client's timeout is the only bound on how long login and refresh can
/// hold up a request.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    base_url: String,
    http: reqwest::Client,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>, timeout: StdDuration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to build http client: {e}")))?;
        Ok(Self::with_http_client(base_url, http))
    }

    /// Use a custom HTTP client (connection pool reuse, tests).
    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self.http.post(self.endpoint(path)).json(body).send().await?;
        let response = Self::ensure_success(response).await?;
        response
            .json::<R>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }

    /// Returns the response on 2xx, otherwise a classified error.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        if status.is_server_error() {
            return Err(BackendError::Unavailable(format!("{status}: {message}")));
        }
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Prefer the backend's `message` field, fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, BackendError> {
        self.post("login", request).await
    }

    async fn refresh(&self, request: &RefreshRequest) -> Result<RefreshResponse, BackendError> {
        self.post("refresh-token", request).await
    }

    async fn sign_out(&self, request: &SignOutRequest) -> Result<(), BackendError> {
        let response = self.http.post(self.endpoint("logout")).json(request).send().await?;
        Self::ensure_success(response).await.map(|_| ())
    }
}
