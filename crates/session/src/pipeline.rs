//! The two-stage session callback pipeline.
//!
//! Stage A (`issue_or_refresh`) settles which credential is current: a sign-in
//! starts a new generation, an expired credential is refreshed, anything else
//! passes through untouched. Stage B (`project`) turns the result into the
//! public [`Session`]. `resolve` always finishes Stage A, even degraded, before
//! running Stage B.
//!
//! A refresh is serialized per credential generation. Concurrent readers of an
//! expired generation share one in-flight call, and readers that show up with
//! the same stale generation shortly after it finished get the same result
//! instead of replaying an already-rotated refresh token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use backoffice_auth::{Credential, PrincipalId, Session};
use backoffice_core::Clock;

use crate::refresher::TokenRefresher;
use crate::single_flight::SingleFlight;

/// Output of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub credential: Credential,
    pub session: Session,
}

/// Default time, in seconds, a finished refresh stays available to late readers.
pub const DEFAULT_REUSE_WINDOW_SECS: i64 = 30;

/// Last settled refresh for one principal.
#[derive(Debug)]
struct Settled {
    stale_access_token: String,
    settled_at: DateTime<Utc>,
    credential: Credential,
}

pub struct SessionCallbacks {
    refresher: TokenRefresher,
    refreshes: SingleFlight<PrincipalId, Credential>,
    settled: Mutex<HashMap<PrincipalId, Settled>>,
    reuse_window: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionCallbacks {
    pub fn new(refresher: TokenRefresher, clock: Arc<dyn Clock>) -> Self {
        Self {
            refresher,
            refreshes: SingleFlight::new(),
            settled: Mutex::new(HashMap::new()),
            reuse_window: Duration::seconds(DEFAULT_REUSE_WINDOW_SECS),
            clock,
        }
    }

    /// How long a settled refresh is handed to readers still holding the
    /// generation it replaced.
    pub fn with_reuse_window(mut self, window: Duration) -> Self {
        self.reuse_window = window;
        self
    }

    /// Stage A.
    pub async fn issue_or_refresh(
        &self,
        stored: Option<Credential>,
        sign_in: Option<Credential>,
    ) -> Option<Credential> {
        if let Some(fresh) = sign_in {
            return Some(self.start_generation(fresh));
        }
        let stored = stored?;
        if !stored.is_expired(self.clock.now()) {
            return Some(stored);
        }

        if let Some(settled) = self.settled_for(&stored) {
            return Some(settled);
        }

        debug!(principal = %stored.principal().id, expires_at = %stored.expires_at(), "access token expired");
        let key = stored.principal().id.clone();
        let refreshed = self
            .refreshes
            .run(key, || async {
                // The previous leader may have settled this generation between
                // our first look and taking the lead.
                if let Some(settled) = self.settled_for(&stored) {
                    return settled;
                }
                let refreshed = self.refresher.refresh(stored.clone()).await;
                self.remember(&stored, &refreshed);
                refreshed
            })
            .await;
        Some(refreshed)
    }

    fn settled_for(&self, stale: &Credential) -> Option<Credential> {
        let now = self.clock.now();
        let mut settled = self.settled.lock().unwrap_or_else(|e| e.into_inner());
        let id = &stale.principal().id;
        let entry = settled.get(id)?;
        if now - entry.settled_at > self.reuse_window {
            settled.remove(id);
            return None;
        }
        if entry.stale_access_token != stale.access_token() {
            return None;
        }
        debug!(principal = %id, "reusing settled refresh for stale generation");
        Some(entry.credential.clone())
    }

    /// Outages are not remembered, so the next reader retries.
    fn remember(&self, stale: &Credential, refreshed: &Credential) {
        if refreshed.last_error().is_some_and(|err| err.is_recoverable()) {
            return;
        }
        let mut settled = self.settled.lock().unwrap_or_else(|e| e.into_inner());
        settled.insert(
            stale.principal().id.clone(),
            Settled {
                stale_access_token: stale.access_token().to_owned(),
                settled_at: self.clock.now(),
                credential: refreshed.clone(),
            },
        );
    }

    /// Stage B.
    pub fn project(&self, credential: &Credential) -> Session {
        Session::project(credential)
    }

    /// Stage A, then Stage B.
    pub async fn resolve(
        &self,
        stored: Option<Credential>,
        sign_in: Option<Credential>,
    ) -> Option<Resolved> {
        let credential = self.issue_or_refresh(stored, sign_in).await?;
        let session = self.project(&credential);
        Some(Resolved { credential, session })
    }

    /// Pipeline run for a fresh sign-in, which always yields a session.
    pub fn sign_in(&self, fresh: Credential) -> Resolved {
        let credential = self.start_generation(fresh);
        let session = self.project(&credential);
        Resolved { credential, session }
    }

    fn start_generation(&self, fresh: Credential) -> Credential {
        info!(principal = %fresh.principal().id, "new credential generation");
        fresh
    }
}
