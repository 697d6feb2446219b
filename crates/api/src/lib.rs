//! HTTP surface: guard middleware, auth routes and the signed session cookie.

pub mod app;
pub mod config;
pub mod context;
pub mod envelope;
pub mod middleware;

pub use app::{AppState, build_app};
pub use config::{Config, ConfigError};
