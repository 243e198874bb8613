// src/client.rs

use crate::config::{Config, TokenVersion};
use crate::error::AzAuthError;
use crate::http::{FetchRequest, HttpFetcher, ReqwestFetcher};
use crate::model::{JsonWebKeySet, OidcDiscoveryDocument, SigningKeySet};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

/// The discovery metadata and signing keys fetched in one load.
#[derive(Debug, Clone)]
pub struct LoadedDiscovery {
    pub metadata: OidcDiscoveryDocument,
    pub keys: SigningKeySet,
}

/// Fetches the discovery document and the key set it points to.
#[derive(Clone)]
pub struct DiscoveryLoader {
    // Shared so clones of the loader reuse one connection pool.
    fetcher: Arc<dyn HttpFetcher>,
}

impl DiscoveryLoader {
    /// Creates a loader using the default reqwest-backed fetcher.
    pub fn new(config: &Config) -> Result<Self, AzAuthError> {
        let fetcher = ReqwestFetcher::new(config.request_timeout)?;
        Ok(Self::with_fetcher(Arc::new(fetcher)))
    }

    /// Creates a loader that sends its requests through `fetcher`.
    pub fn with_fetcher(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self { fetcher }
    }

    /// Loads the discovery document, then the key set it references.
    ///
    /// Either both documents are returned or an error is; a failure of the
    /// second request discards the metadata from the first.
    #[instrument(skip(self, config), fields(tenant = %config.tenant_id), err)]
    pub async fn load(&self, config: &Config) -> Result<LoadedDiscovery, AzAuthError> {
        let discovery_url = discovery_url(config)?;

        debug!("Performing OIDC discovery at: {}", discovery_url);
        let response = self.fetcher.fetch(FetchRequest::get(discovery_url)).await?;
        let metadata: OidcDiscoveryDocument = response.json()?;

        let jwks_uri = Url::parse(&metadata.jwks_uri).map_err(|e| AzAuthError::InvalidDocument {
            url: response.url.clone(),
            reason: format!("jwks_uri is not a valid URL: {}", e),
        })?;

        debug!("Discovered JWKS URI: {}", jwks_uri);
        let response = self.fetcher.fetch(FetchRequest::get(jwks_uri.clone())).await?;
        let jwks: JsonWebKeySet = response.json()?;
        let fetched = jwks.keys.len();

        let keys = SigningKeySet::from_jwks(jwks);
        if keys.is_empty() {
            return Err(AzAuthError::NoSigningKeys(jwks_uri));
        }

        info!("Fetched {} keys from {}, {} usable for signatures", fetched, jwks_uri, keys.len());
        Ok(LoadedDiscovery { metadata, keys })
    }
}

/// Resolves the discovery document URL for `config`.
///
/// An explicit override wins; otherwise the tenant's well-known endpoint on
/// the authority is used, in its v2.0 or legacy shape.
pub fn discovery_url(config: &Config) -> Result<Url, AzAuthError> {
    if let Some(url) = &config.discovery_url {
        debug!("Using discovery URL from config override: {}", url);
        return Ok(url.clone());
    }

    let path = match config.token_version {
        TokenVersion::V2 => format!("{}/v2.0/.well-known/openid-configuration", config.tenant_id),
        TokenVersion::V1 => format!("{}/.well-known/openid-configuration", config.tenant_id),
    };
    config
        .authority
        .join(&path)
        .map_err(|e| AzAuthError::InvalidUrl(e.to_string()))
}
