// src/lib.rs

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod model;
pub mod validator;

/// The public prelude for the `nila-azauth` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder, Settings, TokenVersion};
    pub use crate::error::{AzAuthError, FailureKind};
    pub use crate::gate::{AuthGate, Rejection};
    pub use crate::model::Claims;
    pub use crate::validator::TokenVerifier;
    pub use jsonwebtoken::Algorithm;
}
