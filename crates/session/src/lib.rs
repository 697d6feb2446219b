//! `backoffice-session`: obtaining, refreshing and holding operator credentials.
//!
//! Layering (leaves first):
//! - `backend`: the HTTP auth backend contract and its reqwest client
//! - `authenticator` / `refresher`: the two calls that produce credentials
//! - `single_flight`: one refresh in flight per principal
//! - `pipeline`: issue-or-refresh, then project to a public session
//! - `store` / `context`: the per-session owner of the current credential
//! - `facade`: login/logout/check-auth for UI code

pub mod authenticator;
pub mod backend;
pub mod context;
pub mod facade;
pub mod pipeline;
pub mod refresher;
pub mod single_flight;
pub mod store;

#[cfg(test)]
mod testing;

pub use authenticator::Authenticator;
pub use backend::{
    AuthBackend, BackendError, BackendUser, HttpAuthBackend, LoginRequest, LoginResponse,
    RefreshRequest, RefreshResponse, SignOutRequest,
};
pub use context::SessionContext;
pub use facade::{
    AuthStatus, ClientSessionFacade, FacadeConfig, FacadeState, Navigator, Notice, Notifier,
};
pub use pipeline::{Resolved, SessionCallbacks};
pub use refresher::TokenRefresher;
pub use single_flight::SingleFlight;
pub use store::CredentialStore;
