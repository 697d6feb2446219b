//! Login/logout/check-auth as seen by UI code.
//!
//! The facade turns pipeline state into booleans plus two kinds of side
//! effect, navigation and notices, both injected. It has a single writer (the
//! UI event loop), so its state lives in a `watch` channel rather than behind
//! a lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use backoffice_auth::{Role, TokenState};
use backoffice_core::Clock;

use crate::authenticator::Authenticator;
use crate::backend::{AuthBackend, SignOutRequest};
use crate::context::SessionContext;

/// Where navigation side effects go.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Where user-facing notices go (toasts, banners).
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Unauthenticated,
    Loading,
    Authenticated,
    /// Passed through on a failed login, immediately followed by
    /// `Unauthenticated`. A `watch` receiver may never observe it; the
    /// message stays in [`FacadeState::last_error`].
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeState {
    pub status: AuthStatus,
    /// Message of the last failed login, kept for inline display.
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FacadeConfig {
    pub login_path: String,
    pub dashboard_path: String,
    pub home_path: String,
    /// Upper bound on how long `check_auth` waits for a pending session.
    pub resolution_timeout: Duration,
    /// Upper bound on the remote sign-out call.
    pub sign_out_timeout: Duration,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".into(),
            dashboard_path: "/dashboard".into(),
            home_path: "/".into(),
            resolution_timeout: Duration::from_millis(1500),
            sign_out_timeout: Duration::from_secs(3),
        }
    }
}

pub struct ClientSessionFacade {
    context: Arc<SessionContext>,
    authenticator: Authenticator,
    backend: Arc<dyn AuthBackend>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    config: FacadeConfig,
    clock: Arc<dyn Clock>,
    state: watch::Sender<FacadeState>,
}

impl ClientSessionFacade {
    pub fn new(
        context: Arc<SessionContext>,
        authenticator: Authenticator,
        backend: Arc<dyn AuthBackend>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: FacadeConfig,
    ) -> Self {
        let (state, _) = watch::channel(FacadeState {
            status: AuthStatus::Unauthenticated,
            last_error: None,
        });
        Self {
            context,
            authenticator,
            backend,
            navigator,
            notifier,
            config,
            clock,
            state,
        }
    }

    pub fn status(&self) -> AuthStatus {
        self.state.borrow().status.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FacadeState> {
        self.state.subscribe()
    }

    fn set_status(&self, status: AuthStatus) {
        self.state.send_modify(|s| s.status = status);
    }

    /// Resolve the status from whatever the session context already holds.
    pub async fn restore(&self) {
        self.set_status(AuthStatus::Loading);
        let status = match self.context.read().await {
            Some(session) if session.error().is_none() => AuthStatus::Authenticated,
            _ => AuthStatus::Unauthenticated,
        };
        self.set_status(status);
    }

    /// On failure the status ends at `Unauthenticated` with the user-facing
    /// message in `last_error` until the next attempt.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.state.send_modify(|s| {
            s.status = AuthStatus::Loading;
            s.last_error = None;
        });

        match self.authenticator.authenticate(email, password).await {
            Ok(credential) => {
                self.context.sign_in(credential).await;
                self.set_status(AuthStatus::Authenticated);
                self.notifier.notify(Notice::Success("Signed in".into()));
                self.navigator.navigate(&self.config.dashboard_path);
                true
            }
            Err(err) => {
                let message = err.user_message();
                debug!(error = %err, "login rejected");
                self.state.send_modify(|s| {
                    s.status = AuthStatus::Error(message.clone());
                    s.last_error = Some(message.clone());
                });
                self.notifier.notify(Notice::Error(message));
                self.set_status(AuthStatus::Unauthenticated);
                false
            }
        }
    }

    /// Always succeeds locally; the remote invalidation is best-effort.
    pub async fn logout(&self) {
        let previous = self.context.sign_out().await;
        self.set_status(AuthStatus::Unauthenticated);

        if let Some(credential) = previous {
            let request = SignOutRequest::for_credential(&credential);
            match tokio::time::timeout(self.config.sign_out_timeout, self.backend.sign_out(&request)).await {
                Ok(Ok(())) => debug!(principal = %credential.principal().id, "remote sign-out done"),
                Ok(Err(err)) => warn!(principal = %credential.principal().id, error = %err, "remote sign-out failed"),
                Err(_) => warn!(principal = %credential.principal().id, "remote sign-out timed out"),
            }
        }

        self.navigator.navigate(&self.config.login_path);
    }

    /// Whether the current session may proceed, optionally requiring a role.
    ///
    /// Answers the way the route guard would: an expired access token counts
    /// as no token. Never mutates state and never refreshes. When the answer
    /// is `false` it navigates: to login if there is no usable session, home
    /// on a role mismatch.
    pub async fn check_auth(&self, required_role: Option<&Role>) -> bool {
        let status = self.settled_status().await;
        let session = match status {
            AuthStatus::Authenticated => self.context.peek().await,
            _ => None,
        };
        let usable = session.as_ref().filter(|s| s.error().is_none());

        match TokenState::of(usable, self.clock.now()) {
            TokenState::Valid(principal) => match required_role {
                Some(role) if !principal.has_role(role) => {
                    self.navigator.navigate(&self.config.home_path);
                    false
                }
                _ => true,
            },
            TokenState::Absent | TokenState::Expired => {
                self.navigator.navigate(&self.config.login_path);
                false
            }
        }
    }

    /// Current status, waiting (bounded) while it is `Loading`.
    async fn settled_status(&self) -> AuthStatus {
        let mut rx = self.state.subscribe();
        let settled = tokio::time::timeout(
            self.config.resolution_timeout,
            rx.wait_for(|s| s.status != AuthStatus::Loading),
        )
        .await;
        match settled {
            Ok(Ok(state)) => state.status.clone(),
            _ => self.status(),
        }
    }
}
