// src/model.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The `use` value marking a key as a signature verification key.
pub const SIGNATURE_USE: &str = "sig";

/// Represents the data structure of an OIDC provider's discovery document.
/// Found at the `.well-known/openid-configuration` endpoint.
///
/// All four endpoints are required; a document lacking any of them is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OidcDiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

/// Represents a single JSON Web Key (JWK) as defined in RFC 7517.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JsonWebKey {
    /// Optional per RFC 7517; keys without one cannot be selected by a token.
    #[serde(default)]
    pub kid: Option<String>,
    pub kty: String,
    #[serde(rename = "use")]
    pub use_purpose: Option<String>,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
    /// Base64url SHA-1 thumbprint of the leaf certificate.
    pub x5t: Option<String>,
    /// Certificate chain, leaf first.
    #[serde(default)]
    pub x5c: Vec<String>,
}

impl JsonWebKey {
    /// True when the key is published for signature verification.
    pub fn is_signing_key(&self) -> bool {
        self.use_purpose.as_deref() == Some(SIGNATURE_USE)
    }
}

/// Represents a JSON Web Key Set (JWKS), which is a collection of JWKs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// The signing keys of a provider, indexed by key ID.
#[derive(Debug, Clone, Default)]
pub struct SigningKeySet {
    keys: HashMap<String, JsonWebKey>,
}

impl SigningKeySet {
    /// Keeps only the signing keys of `jwks` that carry a `kid`. When two keys
    /// share a `kid` the later one wins.
    pub fn from_jwks(jwks: JsonWebKeySet) -> Self {
        let keys = jwks
            .keys
            .into_iter()
            .filter(JsonWebKey::is_signing_key)
            .filter_map(|jwk| jwk.kid.clone().map(|kid| (kid, jwk)))
            .collect();
        Self { keys }
    }

    pub fn get(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

/// The claims carried by an Azure AD access token.
///
/// Identity fields are typed; any other payload member is kept in `extra`,
/// so the full decoded payload is available to the caller.
///
/// A typed field that is explicitly `null` in the payload reads as `None`
/// and is omitted when the claims are serialized again. Untyped members keep
/// their `null` value in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Object ID of the principal in the tenant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Client application ID (v1 tokens).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,
    /// Client application ID (v2 tokens).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    // Registered claims.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// The calling application's client ID, from `appid` or `azp`.
    pub fn application_id(&self) -> Option<&str> {
        self.appid.as_deref().or(self.azp.as_deref())
    }

    /// The user's sign-in name, from `unique_name` or `preferred_username`.
    pub fn email(&self) -> Option<&str> {
        self.unique_name.as_deref().or(self.preferred_username.as_deref())
    }
}
