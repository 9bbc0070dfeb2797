//! Multi-tier catalog resolution
//!
//! Sources are tried in strict order, first success wins: the transport
//! token, then the persisted cache, then a remote default fetch. A source is
//! never retried within one resolution. The transport tier is authoritative:
//! on success it unconditionally overwrites the cache.
//!
//! The remote tier is the only suspension point in the core. It runs under a
//! timeout, and dropping the future returned by [`CatalogResolver::resolve`]
//! aborts any in-flight fetch.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{self, Codec};
use crate::domain::aggregates::catalog::CatalogPayload;
use crate::freshness::{classify, Freshness};

pub const CACHE_VERSION: u32 = 1;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Persisted cache blob: the last successfully resolved catalog for one
/// client, stamped with when it was resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CachedCatalog {
    pub cache_version: u32,
    pub client_id: String,
    pub resolved_at: DateTime<Utc>,
    pub catalog: CatalogPayload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source { Transport, Cache, RemoteDefault }

#[derive(Clone, Debug)]
pub struct Resolved {
    pub catalog: CatalogPayload,
    pub freshness: Freshness,
    pub source: Source,
}

/// Terminal resolution failure. Retry policy belongs to the caller.
#[derive(Debug, Error)]
#[error("no catalog available from any source")]
pub struct NoCatalogAvailable;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache blob malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("default catalog endpoint not configured")]
    NotConfigured,
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}

pub trait CacheStore: Send + Sync {
    fn load(&self) -> Result<Option<CachedCatalog>, CacheError>;
    fn store(&self, entry: &CachedCatalog) -> Result<(), CacheError>;
}

#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    async fn fetch_default(&self) -> Result<CatalogPayload, RemoteError>;
}

/// Filesystem cache store under the platform cache directory, one blob per
/// client id.
pub struct FsCacheStore {
    path: PathBuf,
}

impl FsCacheStore {
    pub fn for_client(client_id: &str) -> Result<Self, CacheError> {
        let dirs = directories::ProjectDirs::from("", "", "catalog-link").ok_or_else(|| {
            CacheError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "no home directory"))
        })?;
        std::fs::create_dir_all(dirs.cache_dir())?;
        Ok(Self { path: dirs.cache_dir().join(format!("{client_id}.json")) })
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CacheStore for FsCacheStore {
    fn load(&self) -> Result<Option<CachedCatalog>, CacheError> {
        let bytes = match std::fs::read(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            other => other?,
        };
        let entry: CachedCatalog = serde_json::from_slice(&bytes)?;
        if entry.cache_version != CACHE_VERSION {
            tracing::warn!(version = entry.cache_version, "ignoring cache blob with unsupported version");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn store(&self, entry: &CachedCatalog) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(entry)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

/// Default-catalog fetcher over HTTP. The response body is untrusted and is
/// validated by the resolver exactly like transport-tier data.
pub struct HttpRemote {
    client: reqwest::Client,
    url: Option<String>,
}

impl HttpRemote {
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(DEFAULT_FETCH_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url,
        }
    }
}

#[async_trait]
impl RemoteCatalog for HttpRemote {
    async fn fetch_default(&self) -> Result<CatalogPayload, RemoteError> {
        let url = self.url.as_deref().ok_or(RemoteError::NotConfigured)?;
        let catalog = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<CatalogPayload>()
            .await?;
        Ok(catalog)
    }
}

pub struct CatalogResolver<C, R> {
    codec: Codec,
    cache: C,
    remote: R,
    client_id: String,
    fetch_timeout: Duration,
}

impl<C: CacheStore, R: RemoteCatalog> CatalogResolver<C, R> {
    pub fn new(cache: C, remote: R, client_id: impl Into<String>) -> Self {
        Self {
            codec: Codec::new(),
            cache,
            remote,
            client_id: client_id.into(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub async fn resolve(
        &self,
        transport: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Resolved, NoCatalogAvailable> {
        if let Some(token) = transport {
            match self.codec.decode(token) {
                Ok(catalog) => {
                    let entry = CachedCatalog {
                        cache_version: CACHE_VERSION,
                        client_id: self.client_id.clone(),
                        resolved_at: now,
                        catalog: catalog.clone(),
                    };
                    if let Err(err) = self.cache.store(&entry) {
                        tracing::warn!(%err, "failed to persist resolved catalog");
                    }
                    return Ok(Resolved { freshness: classify(&catalog, now), source: Source::Transport, catalog });
                }
                Err(err) => tracing::warn!(%err, "transport payload rejected; falling back to cache"),
            }
        }

        match self.cache.load() {
            Ok(Some(entry)) => {
                let freshness = classify(&entry.catalog, now);
                if freshness != Freshness::Expired {
                    tracing::debug!(resolved_at = %entry.resolved_at, "serving cached catalog");
                    return Ok(Resolved { catalog: entry.catalog, freshness, source: Source::Cache });
                }
                tracing::warn!(resolved_at = %entry.resolved_at, "cached catalog expired; trying default fetch");
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "cache read failed; treating as miss"),
        }

        match tokio::time::timeout(self.fetch_timeout, self.remote.fetch_default()).await {
            Ok(Ok(catalog)) => {
                if let Err(err) = codec::validate_payload(&catalog) {
                    tracing::warn!(%err, "default catalog failed validation");
                    return Err(NoCatalogAvailable);
                }
                Ok(Resolved { freshness: classify(&catalog, now), source: Source::RemoteDefault, catalog })
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, "default catalog fetch failed");
                Err(NoCatalogAvailable)
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.fetch_timeout, "default catalog fetch timed out");
                Err(NoCatalogAvailable)
            }
        }
    }
}
