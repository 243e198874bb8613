// src/validator.rs

use crate::cache::{DiscoveryCache, DiscoverySnapshot};
use crate::client::DiscoveryLoader;
use crate::config::Config;
use crate::error::AzAuthError;
use crate::model::{Claims, JsonWebKey};
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use std::str::FromStr;
use tracing::{debug, instrument, warn};

/// The main access token verifier.
///
/// This struct is initialized with a `Config` and should be created once
/// and shared by every request handler. It owns the discovery cache and
/// performs all validation steps.
#[derive(Clone)]
pub struct TokenVerifier {
    cache: DiscoveryCache,
}

/// A token decoded without checking its signature.
struct UnverifiedToken {
    header: Header,
    claims: Claims,
}

impl TokenVerifier {
    /// Creates a verifier that talks to the provider over HTTP.
    pub fn new(config: Config) -> Result<Self, AzAuthError> {
        let loader = DiscoveryLoader::new(&config)?;
        Ok(Self::with_loader(config, loader))
    }

    /// Creates a verifier using a caller-supplied loader, e.g. one built
    /// around a custom [`HttpFetcher`](crate::http::HttpFetcher).
    pub fn with_loader(config: Config, loader: DiscoveryLoader) -> Self {
        Self {
            cache: DiscoveryCache::new(config, loader),
        }
    }

    pub fn config(&self) -> &Config {
        self.cache.config()
    }

    pub fn cache(&self) -> &DiscoveryCache {
        &self.cache
    }

    /// Verifies a token against the configured application ID.
    pub async fn verify_for_application(&self, raw_token: &str) -> Result<Claims, AzAuthError> {
        let audience = self.config().application_id.clone();
        self.verify(raw_token, &audience).await
    }

    /// Verifies an access token.
    ///
    /// The checks run in a fixed order:
    /// 1. Strip a `Bearer` scheme prefix.
    /// 2. Make sure discovery metadata and keys are fresh.
    /// 3. Decode header and claims without checking the signature.
    /// 4. Look up the signing key by `kid`.
    /// 5. Compare `aud` with `expected_audience`.
    /// 6. Verify the signature and the `exp`/`nbf` claims.
    /// 7. Compare `iss` with the discovered issuer, when enabled.
    ///
    /// # Returns
    ///
    /// The claims decoded in step 3.
    #[instrument(skip(self, raw_token), err)]
    pub async fn verify(&self, raw_token: &str, expected_audience: &str) -> Result<Claims, AzAuthError> {
        let token = strip_bearer(raw_token);

        let snapshot = self
            .cache
            .ensure_fresh()
            .await
            .map_err(|e| AzAuthError::KeyMaterialUnavailable(Box::new(e)))?;

        let UnverifiedToken { header, claims } = parse_unverified(token)?;

        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AzAuthError::MalformedToken("header has no 'kid'".to_string()))?;
        let jwk = snapshot.keys.get(kid).ok_or_else(|| {
            warn!("Invalid token, could not find public key. Found kid: <{}>", kid);
            AzAuthError::UnknownSigningKey(kid.to_string())
        })?;

        if claims.aud.as_deref() != Some(expected_audience) {
            debug!("Audience mismatch. Expected: {}, Actual: {:?}", expected_audience, claims.aud);
            return Err(AzAuthError::AudienceMismatch {
                expected: expected_audience.to_string(),
                actual: claims.aud.clone(),
            });
        }

        self.verify_signature(token, kid, &header, jwk)?;

        if self.config().validation.validate_issuer {
            check_issuer(&claims, &snapshot)?;
        }

        debug!("Token verified for kid: {}", kid);
        Ok(claims)
    }

    fn verify_signature(&self, token: &str, kid: &str, header: &Header, jwk: &JsonWebKey) -> Result<(), AzAuthError> {
        let validation_details = &self.config().validation;
        if !validation_details.algorithms.contains(&header.alg) {
            return Err(AzAuthError::SignatureInvalid(format!(
                "algorithm {:?} is not allowed",
                header.alg
            )));
        }
        if let Some(alg) = jwk.alg.as_deref() {
            let key_alg = Algorithm::from_str(alg)
                .map_err(|_| AzAuthError::SignatureInvalid(format!("key '{}' declares unknown alg {}", kid, alg)))?;
            if key_alg != header.alg {
                return Err(AzAuthError::SignatureInvalid(format!(
                    "token alg {:?} does not match key alg {:?}",
                    header.alg, key_alg
                )));
            }
        }

        let decoding_key = decoding_key(jwk).map_err(|e| AzAuthError::SignatureInvalid(e.to_string()))?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = validation_details.leeway.as_secs();
        validation.validate_nbf = true;
        // Audience was checked before any cryptography; issuer is optional.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        decode::<serde_json::Value>(token, &decoding_key, &validation)
            .map(|_| ())
            .map_err(|e| {
                debug!("Signature verification failed for kid {}: {}", kid, e);
                AzAuthError::SignatureInvalid(e.to_string())
            })
    }
}

/// Removes a leading `Bearer` scheme (any case) and surrounding whitespace.
pub fn strip_bearer(raw_token: &str) -> &str {
    let trimmed = raw_token.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim_start(),
        None if trimmed.eq_ignore_ascii_case("bearer") => "",
        _ => trimmed,
    }
}

fn parse_unverified(token: &str) -> Result<UnverifiedToken, AzAuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(AzAuthError::MalformedToken(
            "expected three non-empty dot-separated segments".to_string(),
        ));
    }

    let header = decode_header(token).map_err(|e| AzAuthError::MalformedToken(format!("header: {}", e)))?;

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| AzAuthError::MalformedToken(format!("payload encoding: {}", e)))?;
    let claims: Claims =
        serde_json::from_slice(&payload).map_err(|e| AzAuthError::MalformedToken(format!("claims: {}", e)))?;

    Ok(UnverifiedToken { header, claims })
}

fn decoding_key(jwk: &JsonWebKey) -> Result<DecodingKey, AzAuthError> {
    if jwk.kty != "RSA" {
        return Err(AzAuthError::InvalidKeyFormat(format!("unsupported key type '{}'", jwk.kty)));
    }
    DecodingKey::from_rsa_components(
        jwk.n.as_ref().ok_or(AzAuthError::InvalidKeyFormat("missing 'n'".into()))?,
        jwk.e.as_ref().ok_or(AzAuthError::InvalidKeyFormat("missing 'e'".into()))?,
    )
    .map_err(|e| AzAuthError::InvalidKeyFormat(e.to_string()))
}

fn check_issuer(claims: &Claims, snapshot: &DiscoverySnapshot) -> Result<(), AzAuthError> {
    let expected = &snapshot.metadata.issuer;
    if claims.iss.as_deref() == Some(expected.as_str()) {
        return Ok(());
    }
    Err(AzAuthError::IssuerMismatch {
        expected: expected.clone(),
        actual: claims.iss.clone(),
    })
}
