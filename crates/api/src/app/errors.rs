use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use backoffice_auth::AuthError;

pub fn auth_error_to_response(err: &AuthError) -> axum::response::Response {
    let message = err.user_message();
    match err {
        AuthError::ValidationFailure(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        AuthError::AuthFailure(_) | AuthError::RefreshFailure(_) => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", message)
        }
        AuthError::TransportUnavailable(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "auth_unavailable", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
