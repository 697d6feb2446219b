//! Signed cookie envelope around a [`Credential`].
//!
//! The browser holds the credential between requests as an HS256 token signed
//! with the startup secret. Anything that fails to verify is treated as if no
//! cookie had been sent.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use backoffice_auth::Credential;

pub const SESSION_COOKIE: &str = "backoffice.session-token";

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to seal session envelope: {0}")]
    Seal(jsonwebtoken::errors::Error),

    #[error("session envelope rejected: {0}")]
    Open(jsonwebtoken::errors::Error),

    #[error("session envelope carries an invalid credential: {0}")]
    Credential(#[from] backoffice_core::DomainError),
}

#[derive(Debug, Serialize, Deserialize)]
struct EnvelopeClaims {
    sub: String,
    iat: i64,
    exp: i64,
    credential: Credential,
}

#[derive(Clone)]
pub struct EnvelopeCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    max_age: Duration,
    secure: bool,
}

impl EnvelopeCodec {
    pub fn new(secret: &[u8], max_age: Duration, secure: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            max_age,
            secure,
        }
    }

    pub fn seal(&self, credential: &Credential, now: DateTime<Utc>) -> Result<String, EnvelopeError> {
        let iat = now.timestamp();
        let claims = EnvelopeClaims {
            sub: credential.principal().id.to_string(),
            iat,
            exp: iat.saturating_add(i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX)),
            credential: credential.clone(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(EnvelopeError::Seal)
    }

    pub fn open(&self, token: &str) -> Result<Credential, EnvelopeError> {
        let data = jsonwebtoken::decode::<EnvelopeClaims>(token, &self.decoding, &self.validation)
            .map_err(EnvelopeError::Open)?;
        data.claims.credential.validate()?;
        Ok(data.claims.credential)
    }

    /// Credential carried by the request's cookie, if it verifies.
    pub fn read(&self, jar: &CookieJar) -> Option<Credential> {
        let cookie = jar.get(SESSION_COOKIE)?;
        match self.open(cookie.value()) {
            Ok(credential) => Some(credential),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring session cookie");
                None
            }
        }
    }

    /// Cookie carrying a freshly sealed envelope.
    pub fn cookie(&self, credential: &Credential, now: DateTime<Utc>) -> Result<Cookie<'static>, EnvelopeError> {
        let token = self.seal(credential, now)?;
        Ok(Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(
                i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX),
            ))
            .build())
    }

    /// Removal cookie; pass to `CookieJar::remove`.
    pub fn removal(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, "")).path("/").build()
    }
}
