//! Sign-in, sign-out and session lookup.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use backoffice_auth::Session;
use backoffice_session::SignOutRequest;

use crate::app::AppState;
use crate::app::dto::LoginBody;
use crate::app::errors::{auth_error_to_response, json_error};
use crate::envelope::SESSION_COOKIE;
use crate::middleware::{ends_session, reissue_if_changed};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable login body");
            return json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text());
        }
    };
    let credential = match state.authenticator.authenticate(&body.email, &body.password).await {
        Ok(credential) => credential,
        Err(err) => return auth_error_to_response(&err),
    };

    let resolved = state.callbacks.sign_in(credential);
    match state.envelope.cookie(&resolved.credential, state.clock.now()) {
        Ok(cookie) => (jar.add(cookie), Json(resolved.session)).into_response(),
        Err(err) => {
            warn!(error = %err, "could not seal session cookie");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "session_error", "could not start session")
        }
    }
}

/// Always ends the local session; the remote call is bounded and best-effort.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(credential) = state.envelope.read(&jar) {
        let request = SignOutRequest::for_credential(&credential);
        let principal = &credential.principal().id;
        match tokio::time::timeout(state.sign_out_timeout, state.backend.sign_out(&request)).await {
            Ok(Ok(())) => debug!(%principal, "remote sign-out done"),
            Ok(Err(err)) => warn!(%principal, error = %err, "remote sign-out failed"),
            Err(_) => warn!(%principal, "remote sign-out timed out"),
        }
    }

    let jar = jar.remove(state.envelope.removal());
    (jar, Redirect::to(&state.login_path)).into_response()
}

/// Current session, refreshed if needed, or `null`.
async fn session(State(state): State<AppState>, jar: CookieJar) -> Response {
    let stored = state.envelope.read(&jar);
    let Some(resolved) = state.callbacks.resolve(stored.clone(), None).await else {
        let jar = if jar.get(SESSION_COOKIE).is_some() {
            jar.remove(state.envelope.removal())
        } else {
            jar
        };
        return (jar, Json(None::<Session>)).into_response();
    };

    let jar = if ends_session(&resolved) {
        jar.remove(state.envelope.removal())
    } else {
        reissue_if_changed(&state, jar, stored.as_ref(), &resolved)
    };
    (jar, Json(Some(resolved.session))).into_response()
}
