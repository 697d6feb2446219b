use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use backoffice_auth::{Credential, RouteDecision, TokenState};
use backoffice_session::Resolved;

use crate::app::AppState;
use crate::context::RequestSession;
use crate::envelope::SESSION_COOKIE;

/// Route guard in front of every handler.
///
/// Paths outside both the public and protected sets pass through untouched.
/// Public paths never read the cookie. Protected paths run the session
/// pipeline (refreshing an expired token) and then the guard decision.
pub async fn session_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();

    if state.guard.is_public(&path) || !state.protected.matches(&path) {
        return next.run(req).await;
    }

    let stored = state.envelope.read(&jar);
    let resolved = state.callbacks.resolve(stored.clone(), None).await;
    let token = TokenState::of(resolved.as_ref().map(|r| &r.session), state.clock.now());

    match state.guard.decide(&path, &token) {
        RouteDecision::Allow => {
            let Some(resolved) = resolved else {
                // Allow without a session only happens for public paths.
                return next.run(req).await;
            };
            req.extensions_mut()
                .insert(RequestSession::new(resolved.session.clone()));
            let jar = reissue_if_changed(&state, jar, stored.as_ref(), &resolved);
            (jar, next.run(req).await).into_response()
        }
        RouteDecision::RedirectLogin => {
            let jar = match &resolved {
                Some(r) if !ends_session(r) => reissue_if_changed(&state, jar, stored.as_ref(), r),
                _ if jar.get(SESSION_COOKIE).is_some() => jar.remove(state.envelope.removal()),
                _ => jar,
            };
            debug!(path, "redirecting to login");
            (jar, Redirect::temporary(&state.login_path)).into_response()
        }
        RouteDecision::RedirectHome => {
            let jar = match &resolved {
                Some(r) => reissue_if_changed(&state, jar, stored.as_ref(), r),
                None => jar,
            };
            debug!(path, "role mismatch, redirecting home");
            (jar, Redirect::temporary(&state.home_path)).into_response()
        }
    }
}

/// A refresh the backend rejected ends the browser session.
pub(crate) fn ends_session(resolved: &Resolved) -> bool {
    resolved
        .credential
        .last_error()
        .is_some_and(|err| !err.is_recoverable())
}

/// Write the credential back to the cookie when Stage A replaced it.
pub(crate) fn reissue_if_changed(
    state: &AppState,
    jar: CookieJar,
    stored: Option<&Credential>,
    resolved: &Resolved,
) -> CookieJar {
    if stored == Some(&resolved.credential) {
        return jar;
    }
    match state.envelope.cookie(&resolved.credential, state.clock.now()) {
        Ok(cookie) => jar.add(cookie),
        Err(err) => {
            warn!(error = %err, "could not re-issue session cookie");
            jar
        }
    }
}
