// src/gate.rs

use crate::error::AzAuthError;
use crate::model::Claims;
use crate::validator::{strip_bearer, TokenVerifier};
use ::http::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// The only message ever shown to a rejected caller.
pub const REJECTION_DETAIL: &str = "Invalid token!";

/// What a request handler should answer when authorization fails.
///
/// Every failure collapses into the same status and message so a caller
/// cannot tell which check rejected its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    #[serde(skip)]
    pub status: StatusCode,
    pub detail: &'static str,
}

impl Rejection {
    /// Logs `error` and returns the generic rejection.
    pub fn from_error(error: &AzAuthError) -> Self {
        warn!(kind = error.kind().as_str(), "Rejecting request: {}", error);
        Self {
            status: StatusCode::FORBIDDEN,
            detail: REJECTION_DETAIL,
        }
    }
}

/// Framework-neutral authorization check for incoming requests.
#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<TokenVerifier>,
}

impl AuthGate {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Checks the value of an `Authorization` header and returns the caller's
    /// claims, verified against the configured application ID.
    pub async fn authorize(&self, authorization_header: Option<&str>) -> Result<Claims, Rejection> {
        self.check(authorization_header)
            .await
            .map_err(|e| Rejection::from_error(&e))
    }

    async fn check(&self, authorization_header: Option<&str>) -> Result<Claims, AzAuthError> {
        let token = authorization_header.map(strip_bearer).unwrap_or_default();
        if token.is_empty() {
            return Err(AzAuthError::MissingToken);
        }
        self.verifier.verify_for_application(token).await
    }
}
