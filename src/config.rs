// src/config.rs

use crate::error::AzAuthError;
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// The public Azure AD authority used when no other host is configured.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_LEEWAY: Duration = Duration::from_secs(60);

/// The access token schema version issued for the application.
///
/// Selects the shape of the well-known discovery URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenVersion {
    /// Legacy `sts.windows.net` tokens.
    #[default]
    V1,
    /// Microsoft identity platform v2.0 tokens.
    V2,
}

impl TryFrom<u8> for TokenVersion {
    type Error = AzAuthError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TokenVersion::V1),
            2 => Ok(TokenVersion::V2),
            other => Err(AzAuthError::InvalidConfiguration(format!(
                "token_version must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

/// Contains the validation settings applied to every access token.
#[derive(Debug, Clone)]
pub struct ValidationDetails {
    /// The signing algorithms that are permitted for the access token.
    /// Tokens signed with any other algorithm will be rejected.
    pub algorithms: Vec<Algorithm>,
    /// The tolerance for clock skew when validating `exp` and `nbf`.
    /// Defaults to 60 seconds.
    pub leeway: Duration,
    /// Whether the `iss` claim must equal the issuer from the discovery document.
    pub validate_issuer: bool,
}

impl Default for ValidationDetails {
    fn default() -> Self {
        Self {
            // Azure AD signs access tokens with RS256.
            algorithms: vec![Algorithm::RS256],
            leeway: DEFAULT_LEEWAY,
            validate_issuer: false,
        }
    }
}

/// The main configuration for the token verifier.
///
/// Supplied once at construction and immutable afterwards. It should be
/// constructed using the `ConfigBuilder`, or converted from [`Settings`].
#[derive(Debug, Clone)]
pub struct Config {
    /// The directory (tenant) the application is registered in.
    pub tenant_id: String,
    /// The application (client) ID. Used as the expected audience.
    pub application_id: String,
    pub token_version: TokenVersion,
    /// Explicit discovery document URL. When set it is used verbatim and the
    /// authority/tenant based URL is not derived.
    pub discovery_url: Option<Url>,
    /// Host of the identity provider, e.g. a sovereign cloud authority.
    pub authority: Url,
    /// How long a loaded discovery document and key set stay fresh.
    pub refresh_interval: Duration,
    /// Upper bound for each discovery or key-set request.
    pub request_timeout: Duration,
    pub validation: ValidationDetails,
}

/// A builder for creating a `Config` instance.
#[derive(Default)]
pub struct ConfigBuilder {
    tenant_id: Option<String>,
    application_id: Option<String>,
    token_version: TokenVersion,
    discovery_url: Option<Url>,
    authority: Option<Url>,
    refresh_interval: Option<Duration>,
    request_timeout: Option<Duration>,
    validation: ValidationDetails,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tenant ID. This is a required field.
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Sets the application (client) ID. This is a required field.
    pub fn application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    pub fn token_version(mut self, version: TokenVersion) -> Self {
        self.token_version = version;
        self
    }

    /// Sets an explicit discovery document URL, bypassing the tenant based one.
    pub fn discovery_url(mut self, url: &str) -> Result<Self, AzAuthError> {
        let parsed_url = Url::parse(url).map_err(|e| AzAuthError::InvalidUrl(e.to_string()))?;
        self.discovery_url = Some(parsed_url);
        Ok(self)
    }

    /// Overrides the authority host. Defaults to [`DEFAULT_AUTHORITY`].
    pub fn authority(mut self, url: &str) -> Result<Self, AzAuthError> {
        let parsed_url = Url::parse(url).map_err(|e| AzAuthError::InvalidUrl(e.to_string()))?;
        self.authority = Some(parsed_url);
        Ok(self)
    }

    /// Sets the freshness window of the cached discovery data.
    /// Defaults to 24 hours.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Sets the per-request timeout. Defaults to 10 seconds.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the allowed signing algorithms.
    /// Defaults to `[Algorithm::RS256]` if not set.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.validation.algorithms = algorithms;
        self
    }

    /// Sets the clock skew tolerance. Defaults to 60 seconds.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.validation.leeway = leeway;
        self
    }

    /// Requires the `iss` claim to match the discovered issuer.
    pub fn validate_issuer(mut self, validate: bool) -> Self {
        self.validation.validate_issuer = validate;
        self
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns an error if `tenant_id` or `application_id` is missing or blank,
    /// or if no signing algorithm is allowed.
    pub fn build(self) -> Result<Config, AzAuthError> {
        let tenant_id = required(self.tenant_id, "tenant_id")?;
        let application_id = required(self.application_id, "application_id")?;

        if self.validation.algorithms.is_empty() {
            return Err(AzAuthError::InvalidConfiguration(
                "at least one signing algorithm must be allowed".to_string(),
            ));
        }

        let authority = match self.authority {
            Some(url) => url,
            None => Url::parse(DEFAULT_AUTHORITY).map_err(|e| AzAuthError::InvalidUrl(e.to_string()))?,
        };

        Ok(Config {
            tenant_id,
            application_id,
            token_version: self.token_version,
            discovery_url: self.discovery_url,
            authority,
            refresh_interval: self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            validation: self.validation,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, AzAuthError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AzAuthError::MissingConfiguration(field.to_string())),
    }
}

/// Serializable form of [`Config`], suitable for loading from a YAML, TOML or
/// JSON settings file. Durations are expressed in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub tenant_id: String,
    pub application_id: String,
    #[serde(default = "default_token_version")]
    pub token_version: u8,
    pub discovery_url: Option<String>,
    pub authority: Option<String>,
    pub refresh_interval_seconds: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
    pub algorithms: Option<Vec<Algorithm>>,
    pub leeway_seconds: Option<u64>,
    #[serde(default)]
    pub validate_issuer: bool,
}

fn default_token_version() -> u8 {
    1
}

impl TryFrom<Settings> for Config {
    type Error = AzAuthError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let mut builder = ConfigBuilder::new()
            .tenant_id(settings.tenant_id)
            .application_id(settings.application_id)
            .token_version(TokenVersion::try_from(settings.token_version)?)
            .validate_issuer(settings.validate_issuer);

        if let Some(url) = settings.discovery_url.as_deref() {
            builder = builder.discovery_url(url)?;
        }
        if let Some(url) = settings.authority.as_deref() {
            builder = builder.authority(url)?;
        }
        if let Some(secs) = settings.refresh_interval_seconds {
            builder = builder.refresh_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = settings.request_timeout_seconds {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(algorithms) = settings.algorithms {
            builder = builder.algorithms(algorithms);
        }
        if let Some(secs) = settings.leeway_seconds {
            builder = builder.leeway(Duration::from_secs(secs));
        }
        builder.build()
    }
}
