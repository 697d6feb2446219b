//! `backoffice-auth`: pure identity model and request-time access decisions.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows what a
//! credential looks like and how to judge one, never how to obtain one.

pub mod credential;
pub mod error;
pub mod guard;
pub mod names;
pub mod principal;
pub mod session;

pub use credential::{Credential, CredentialError};
pub use error::AuthError;
pub use guard::{PathPrefixes, RoleRule, RouteDecision, RouteGuard, TokenState};
pub use names::{Permission, Role};
pub use principal::{Principal, PrincipalId};
pub use session::{Session, SessionError};
