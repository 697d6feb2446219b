//! HTTP application wiring (Axum router + shared state).
//!
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tower::ServiceBuilder;

use backoffice_auth::{PathPrefixes, RouteGuard};
use backoffice_core::{Clock, SystemClock};
use backoffice_session::{
    AuthBackend, Authenticator, BackendError, HttpAuthBackend, SessionCallbacks, TokenRefresher,
};

use crate::config::Config;
use crate::envelope::EnvelopeCodec;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Everything handlers and the guard middleware share.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub callbacks: Arc<SessionCallbacks>,
    pub backend: Arc<dyn AuthBackend>,
    pub guard: Arc<RouteGuard>,
    pub protected: PathPrefixes,
    pub envelope: EnvelopeCodec,
    pub clock: Arc<dyn Clock>,
    pub login_path: String,
    pub home_path: String,
    pub sign_out_timeout: Duration,
}

impl AppState {
    /// Wire the real HTTP auth backend from startup configuration.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let backend = HttpAuthBackend::new(config.auth_base_url.clone(), config.auth_http_timeout)?;
        Ok(Self::with_backend(config, Arc::new(backend), Arc::new(SystemClock)))
    }

    pub fn with_backend(config: &Config, backend: Arc<dyn AuthBackend>, clock: Arc<dyn Clock>) -> Self {
        let refresher = TokenRefresher::new(backend.clone(), clock.clone());
        let guard = RouteGuard::new(config.public_paths.clone()).with_role_rules(config.role_rules.clone());

        Self {
            authenticator: Arc::new(Authenticator::new(backend.clone(), clock.clone())),
            callbacks: Arc::new(SessionCallbacks::new(refresher, clock.clone())),
            backend,
            guard: Arc::new(guard),
            protected: config.protected_paths.clone(),
            envelope: EnvelopeCodec::new(
                config.session_secret(),
                config.session_max_age,
                config.secure_cookies,
            ),
            clock,
            login_path: config.login_path.clone(),
            home_path: config.home_path.clone(),
            sign_out_timeout: config.sign_out_timeout,
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::auth::router())
        .merge(routes::pages::router())
        .layer(
            ServiceBuilder::new().layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::session_guard,
            )),
        )
        .with_state(state)
}
