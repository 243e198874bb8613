// src/error.rs

use thiserror::Error;
use url::Url;

/// The primary error type for the `nila-azauth` library.
#[derive(Debug, Error)]
pub enum AzAuthError {
    /// No token was presented with the request.
    #[error("No bearer token was provided")]
    MissingToken,

    /// The token is not a well-formed three-part signed JWT, or its header or
    /// claims could not be decoded.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The discovery document or the signing keys could not be obtained.
    #[error("Signing key material is unavailable: {0}")]
    KeyMaterialUnavailable(#[source] Box<AzAuthError>),

    /// The token's `kid` is not present in the current signing key set.
    #[error("No signing key found for kid: {0}")]
    UnknownSigningKey(String),

    /// The token was issued for a different application.
    #[error("Audience mismatch. Expected: {expected}, Actual: {actual:?}")]
    AudienceMismatch {
        expected: String,
        actual: Option<String>,
    },

    /// Signature, algorithm or time-claim verification failed.
    #[error("Token signature is invalid: {0}")]
    SignatureInvalid(String),

    /// The token's `iss` claim does not match the provider's issuer.
    #[error("Issuer mismatch. Expected: {expected}, Actual: {actual:?}")]
    IssuerMismatch {
        expected: String,
        actual: Option<String>,
    },

    /// An error occurred while sending an HTTP request.
    #[error("HTTP request to {url} failed: {source}")]
    HttpError {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with an error status.
    #[error("Request to {url} returned status {status}")]
    HttpStatus { url: Url, status: u16 },

    /// A fetched document could not be parsed or lacks required fields.
    #[error("Invalid document from {url}: {reason}")]
    InvalidDocument { url: Url, reason: String },

    /// The key set contained no keys usable for signature verification.
    #[error("The key set at {0} contains no signing keys")]
    NoSigningKeys(Url),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A required configuration field is missing.
    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A JWK could not be turned into a verification key.
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),
}

/// Coarse classification of an [`AzAuthError`], convenient for logging and
/// metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    MissingToken,
    MalformedToken,
    KeyMaterialUnavailable,
    UnknownSigningKey,
    AudienceMismatch,
    SignatureInvalid,
    IssuerMismatch,
    Discovery,
    Configuration,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingToken => "missing_token",
            FailureKind::MalformedToken => "malformed_token",
            FailureKind::KeyMaterialUnavailable => "key_material_unavailable",
            FailureKind::UnknownSigningKey => "unknown_signing_key",
            FailureKind::AudienceMismatch => "audience_mismatch",
            FailureKind::SignatureInvalid => "signature_invalid",
            FailureKind::IssuerMismatch => "issuer_mismatch",
            FailureKind::Discovery => "discovery",
            FailureKind::Configuration => "configuration",
        }
    }
}

impl AzAuthError {
    /// Returns the failure class of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            AzAuthError::MissingToken => FailureKind::MissingToken,
            AzAuthError::MalformedToken(_) => FailureKind::MalformedToken,
            AzAuthError::KeyMaterialUnavailable(_) => FailureKind::KeyMaterialUnavailable,
            AzAuthError::UnknownSigningKey(_) => FailureKind::UnknownSigningKey,
            AzAuthError::AudienceMismatch { .. } => FailureKind::AudienceMismatch,
            AzAuthError::SignatureInvalid(_) | AzAuthError::InvalidKeyFormat(_) => {
                FailureKind::SignatureInvalid
            }
            AzAuthError::IssuerMismatch { .. } => FailureKind::IssuerMismatch,
            AzAuthError::HttpError { .. }
            | AzAuthError::HttpStatus { .. }
            | AzAuthError::InvalidDocument { .. }
            | AzAuthError::NoSigningKeys(_) => FailureKind::Discovery,
            AzAuthError::InvalidUrl(_)
            | AzAuthError::MissingConfiguration(_)
            | AzAuthError::InvalidConfiguration(_) => FailureKind::Configuration,
        }
    }
}
