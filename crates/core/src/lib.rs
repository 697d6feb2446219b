//! `backoffice-core`: foundation building blocks shared by the identity crates.
//!
//! This crate contains **pure** primitives (no IO, no transport concerns).

pub mod clock;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, DomainResult};
