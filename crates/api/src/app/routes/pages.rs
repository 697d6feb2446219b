//! Guarded pages. They only render what the guard already resolved.

use axum::{Extension, Json, Router, routing::get};

use crate::app::{AppState, dto::PageView};
use crate::context::RequestSession;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/admin", get(admin))
        .route("/protected", get(protected))
}

fn view(section: &'static str, current: &RequestSession) -> Json<PageView> {
    Json(PageView {
        section,
        principal: current.principal().clone(),
        expires_at: current.session().expires_at(),
    })
}

async fn dashboard(Extension(current): Extension<RequestSession>) -> Json<PageView> {
    view("dashboard", &current)
}

async fn admin(Extension(current): Extension<RequestSession>) -> Json<PageView> {
    view("admin", &current)
}

async fn protected(Extension(current): Extension<RequestSession>) -> Json<PageView> {
    view("protected", &current)
}
