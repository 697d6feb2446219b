//! Per-session owner of the current credential.

use std::sync::Arc;

use tracing::info;

use backoffice_auth::{Credential, Session};

use crate::pipeline::SessionCallbacks;
use crate::store::CredentialStore;

/// One operator session: a credential store plus the pipeline that reads it.
///
/// Created when a session starts and torn down at logout; there is no
/// process-wide session state.
pub struct SessionContext {
    store: CredentialStore,
    callbacks: Arc<SessionCallbacks>,
}

impl SessionContext {
    pub fn new(callbacks: Arc<SessionCallbacks>) -> Self {
        Self {
            store: CredentialStore::new(),
            callbacks,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Start a new credential generation from a successful sign-in.
    pub async fn sign_in(&self, credential: Credential) -> Session {
        let resolved = self.callbacks.sign_in(credential);
        self.store.replace(resolved.credential).await;
        resolved.session
    }

    /// Read the session, refreshing first if the access token has expired.
    ///
    /// A refresh that the backend rejected outright ends the session: the
    /// degraded session is returned once so callers can see the error, and the
    /// credential is dropped from the store.
    pub async fn read(&self) -> Option<Session> {
        let stored = self.store.snapshot().await?;
        let resolved = self.callbacks.resolve(Some(stored.clone()), None).await?;

        if resolved.credential != stored {
            match resolved.credential.last_error() {
                Some(err) if !err.is_recoverable() => {
                    if self.store.clear_if_current(&stored).await {
                        info!(principal = %stored.principal().id, "session ended after rejected refresh");
                    }
                }
                _ => {
                    self.store
                        .replace_if_current(&stored, resolved.credential)
                        .await;
                }
            }
        }
        Some(resolved.session)
    }

    /// Project the stored credential without running Stage A.
    pub async fn peek(&self) -> Option<Session> {
        let stored = self.store.snapshot().await?;
        Some(self.callbacks.project(&stored))
    }

    /// Tear the session down, returning the credential it held.
    pub async fn sign_out(&self) -> Option<Credential> {
        let previous = self.store.clear().await;
        if let Some(c) = &previous {
            info!(principal = %c.principal().id, "signed out");
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tokio::task::JoinSet;

    use super::*;
    use crate::backend::BackendError;
    use crate::refresher::TokenRefresher;
    use crate::testing::{StubBackend, credential};
    use backoffice_auth::SessionError;
    use backoffice_core::ManualClock;

    fn context(backend: Arc<StubBackend>, clock: Arc<ManualClock>) -> SessionContext {
        let refresher = TokenRefresher::new(backend, clock.clone());
        SessionContext::new(Arc::new(SessionCallbacks::new(refresher, clock)))
    }

    #[tokio::test]
    async fn read_before_sign_in_is_empty() {
        let ctx = context(Arc::new(StubBackend::new()), Arc::new(ManualClock::new(Utc::now())));
        assert!(ctx.read().await.is_none());
        assert!(ctx.peek().await.is_none());
    }

    #[tokio::test]
    async fn refreshed_credential_is_written_back() {
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));
        let backend = Arc::new(StubBackend::new());
        let ctx = context(backend.clone(), clock.clone());

        ctx.sign_in(credential(now, 60)).await;
        clock.advance(Duration::seconds(61));

        let session = ctx.read().await.unwrap();
        assert_eq!(session.access_token(), "A2");
        assert_eq!(ctx.store().snapshot().await.unwrap().access_token(), "A2");

        // second read sees the stored fresh token, no new refresh
        ctx.read().await.unwrap();
        assert_eq!(backend.refresh_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_refresh() {
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));
        let backend = Arc::new(
            StubBackend::new().with_refresh_delay(std::time::Duration::from_millis(50)),
        );
        let ctx = Arc::new(context(backend.clone(), clock.clone()));
        ctx.sign_in(credential(now, 60)).await;
        clock.advance(Duration::seconds(120));

        let mut readers = JoinSet::new();
        for _ in 0..16 {
            let ctx = ctx.clone();
            readers.spawn(async move { ctx.read().await });
        }
        while let Some(result) = readers.join_next().await {
            assert_eq!(result.unwrap().unwrap().access_token(), "A2");
        }
        assert_eq!(backend.refresh_count(), 1);
    }

    #[tokio::test]
    async fn outage_keeps_the_credential_for_a_later_retry() {
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));
        let backend = Arc::new(
            StubBackend::new().with_refresh(Err(BackendError::Unavailable("refused".into()))),
        );
        let ctx = context(backend.clone(), clock.clone());
        ctx.sign_in(credential(now, 60)).await;
        clock.advance(Duration::seconds(61));

        let session = ctx.read().await.unwrap();
        assert_eq!(session.error(), Some(SessionError::RefreshAccessToken));
        assert!(ctx.store().is_present().await);

        ctx.read().await.unwrap();
        assert_eq!(backend.refresh_count(), 2);
    }

    #[tokio::test]
    async fn rejected_refresh_ends_the_session() {
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));
        let backend = Arc::new(StubBackend::new().with_refresh(Err(BackendError::Rejected {
            status: 401,
            message: "revoked".into(),
        })));
        let ctx = context(backend, clock.clone());
        ctx.sign_in(credential(now, 60)).await;
        clock.advance(Duration::seconds(61));

        let session = ctx.read().await.unwrap();
        assert_eq!(session.error(), Some(SessionError::RefreshAccessToken));
        assert!(ctx.read().await.is_none());
    }

    #[tokio::test]
    async fn peek_never_refreshes() {
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));
        let backend = Arc::new(StubBackend::new());
        let ctx = context(backend.clone(), clock.clone());
        ctx.sign_in(credential(now, 60)).await;
        clock.advance(Duration::seconds(61));

        assert_eq!(ctx.peek().await.unwrap().access_token(), "A1");
        assert_eq!(backend.refresh_count(), 0);
    }

    #[tokio::test]
    async fn sign_out_returns_and_clears() {
        let ctx = context(Arc::new(StubBackend::new()), Arc::new(ManualClock::new(Utc::now())));
        ctx.sign_in(credential(Utc::now(), 60)).await;

        assert!(ctx.sign_out().await.is_some());
        assert!(ctx.sign_out().await.is_none());
        assert!(ctx.read().await.is_none());
    }
}
