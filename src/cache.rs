// src/cache.rs

use crate::client::{DiscoveryLoader, LoadedDiscovery};
use crate::config::Config;
use crate::error::AzAuthError;
use crate::model::{OidcDiscoveryDocument, SigningKeySet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// An immutable view of the provider's metadata and keys as of one refresh.
#[derive(Debug)]
pub struct DiscoverySnapshot {
    pub metadata: OidcDiscoveryDocument,
    pub keys: SigningKeySet,
    /// When the load that produced this snapshot completed.
    pub refreshed_at: Instant,
}

/// Caches the discovery document and signing keys of one (tenant, application)
/// pair and reloads them once they are older than the refresh interval.
///
/// Metadata and keys are swapped together as one snapshot, so concurrent
/// readers never observe a mix of two refreshes.
#[derive(Clone)]
pub struct DiscoveryCache {
    // The cache is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    loader: DiscoveryLoader,
    current: RwLock<Option<Arc<DiscoverySnapshot>>>,
    // Serializes refreshes so concurrent callers share one fetch.
    refresh_lock: Mutex<()>,
}

impl DiscoveryCache {
    /// Creates an empty cache. Nothing is fetched until first use.
    pub fn new(config: Config, loader: DiscoveryLoader) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                loader,
                current: RwLock::new(None),
                refresh_lock: Mutex::new(()),
            }),
        }
    }

    /// Returns a snapshot loaded within the refresh interval, loading a new
    /// one first if the current one is missing or stale.
    ///
    /// On failure the previous snapshot, if any, stays in place.
    #[instrument(skip(self), err)]
    pub async fn ensure_fresh(&self) -> Result<Arc<DiscoverySnapshot>, AzAuthError> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            return Ok(snapshot);
        }

        let _refresh_guard = self.inner.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(snapshot) = self.fresh_snapshot().await {
            debug!("Discovery cache was refreshed while waiting for lock");
            return Ok(snapshot);
        }

        self.load_and_swap().await
    }

    /// Reloads the metadata and keys regardless of their age.
    #[instrument(skip(self), err)]
    pub async fn refresh(&self) -> Result<Arc<DiscoverySnapshot>, AzAuthError> {
        let _refresh_guard = self.inner.refresh_lock.lock().await;
        self.load_and_swap().await
    }

    /// The current snapshot, fresh or not, without any network I/O.
    pub async fn snapshot(&self) -> Option<Arc<DiscoverySnapshot>> {
        self.inner.current.read().await.clone()
    }

    /// When the current snapshot was loaded, if one exists.
    pub async fn last_refreshed_at(&self) -> Option<Instant> {
        self.snapshot().await.map(|s| s.refreshed_at)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    async fn fresh_snapshot(&self) -> Option<Arc<DiscoverySnapshot>> {
        let snapshot = self.snapshot().await?;
        if snapshot.refreshed_at.elapsed() < self.inner.config.refresh_interval {
            Some(snapshot)
        } else {
            None
        }
    }

    // Caller must hold `refresh_lock`.
    async fn load_and_swap(&self) -> Result<Arc<DiscoverySnapshot>, AzAuthError> {
        let LoadedDiscovery { metadata, keys } = match self.inner.loader.load(&self.inner.config).await {
            Ok(loaded) => loaded,
            Err(e) => {
                if self.snapshot().await.is_some() {
                    warn!("Failed to refresh discovery settings, keeping previous ones: {}", e);
                } else {
                    warn!("Failed to load discovery settings: {}", e);
                }
                return Err(e);
            }
        };

        info!("Settings from Azure AD loaded");
        info!("Authorization endpoint: {}", metadata.authorization_endpoint);
        info!("Token endpoint:         {}", metadata.token_endpoint);
        info!("Issuer:                 {}", metadata.issuer);
        info!("Signing keys:           {}", keys.len());

        let snapshot = Arc::new(DiscoverySnapshot {
            metadata,
            keys,
            refreshed_at: Instant::now(),
        });
        *self.inner.current.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }
}
