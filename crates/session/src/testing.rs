//! Shared fixtures for this crate's tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use backoffice_auth::{Credential, Principal};

use crate::backend::{
    AuthBackend, BackendError, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
    SignOutRequest,
};

/// Serve `router` on an ephemeral port; returns its base URL.
pub(crate) async fn spawn_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub(crate) async fn refused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub(crate) fn login_ok(access: &str, refresh: &str, expires_in: u64) -> LoginResponse {
    LoginResponse {
        access_token: access.into(),
        refresh_token: Some(refresh.into()),
        user: None,
        expires_in,
    }
}

pub(crate) fn refresh_ok(access: &str, refresh: &str, expires_in: u64) -> RefreshResponse {
    RefreshResponse {
        access_token: access.into(),
        refresh_token: Some(refresh.into()),
        admin: None,
        expires_in,
    }
}

/// Credential for `admin@example.com` issued at `issued_at`.
pub(crate) fn credential(issued_at: DateTime<Utc>, lifetime_secs: i64) -> Credential {
    Credential::issue(
        "A1",
        Some("R1".into()),
        Principal::from_email("admin@example.com"),
        issued_at,
        Duration::seconds(lifetime_secs),
    )
    .unwrap()
}

/// Scriptable in-process backend that counts calls.
pub(crate) struct StubBackend {
    login: Result<LoginResponse, BackendError>,
    refresh: Result<RefreshResponse, BackendError>,
    refresh_delay: StdDuration,
    sign_out: Result<(), BackendError>,
    sign_out_delay: StdDuration,
    pub(crate) login_calls: AtomicUsize,
    pub(crate) refresh_calls: AtomicUsize,
    pub(crate) sign_out_calls: AtomicUsize,
}

impl StubBackend {
    pub(crate) fn new() -> Self {
        Self {
            login: Ok(login_ok("A1", "R1", 3600)),
            refresh: Ok(refresh_ok("A2", "R2", 3600)),
            refresh_delay: StdDuration::ZERO,
            sign_out: Ok(()),
            sign_out_delay: StdDuration::ZERO,
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_login(mut self, result: Result<LoginResponse, BackendError>) -> Self {
        self.login = result;
        self
    }

    pub(crate) fn with_refresh(mut self, result: Result<RefreshResponse, BackendError>) -> Self {
        self.refresh = result;
        self
    }

    pub(crate) fn with_refresh_delay(mut self, delay: StdDuration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub(crate) fn with_sign_out(mut self, result: Result<(), BackendError>) -> Self {
        self.sign_out = result;
        self
    }

    pub(crate) fn with_sign_out_delay(mut self, delay: StdDuration) -> Self {
        self.sign_out_delay = delay;
        self
    }

    pub(crate) fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for StubBackend {
    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse, BackendError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login.clone()
    }

    async fn refresh(&self, _request: &RefreshRequest) -> Result<RefreshResponse, BackendError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        self.refresh.clone()
    }

    async fn sign_out(&self, _request: &SignOutRequest) -> Result<(), BackendError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if !self.sign_out_delay.is_zero() {
            tokio::time::sleep(self.sign_out_delay).await;
        }
        self.sign_out.clone()
    }
}
