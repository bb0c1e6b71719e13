//! Remote media catalog
//!
//! A catalog is an HTTP endpoint returning a JSON listing of remote media
//! items. Each refresh mirrors new items into the [`MemoryLibrary`] under one
//! container per catalog.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hearth_task_processor::{CancellationToken, ObjectId, OnlineService, TaskError, TaskResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::library::MemoryLibrary;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// One entry of a catalog listing
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct CatalogListing {
    #[serde(default)]
    items: Vec<CatalogItem>,
}

/// Online service backed by a JSON catalog endpoint
pub struct RemoteCatalog {
    http_client: Client,
    name: String,
    url: String,
    refresh_interval: Option<Duration>,
    library: Arc<MemoryLibrary>,
}

impl fmt::Debug for RemoteCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCatalog")
            .field("name", &self.name)
            .field("url", &"[REDACTED]")
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

impl RemoteCatalog {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        library: Arc<MemoryLibrary>,
    ) -> reqwest::Result<Self> {
        Self::with_timeout(name, url, library, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a catalog whose requests give up after `timeout`
    pub fn with_timeout(
        name: impl Into<String>,
        url: impl Into<String>,
        library: Arc<MemoryLibrary>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(2)
            .user_agent(concat!("Hearth/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            name: name.into(),
            url: url.into(),
            refresh_interval: None,
            library,
        })
    }

    /// Refresh on a timer every `interval`; zero keeps on-demand refreshes only
    pub fn every(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval).filter(|i| !i.is_zero());
        self
    }

    fn map_http_error(&self, e: reqwest::Error) -> TaskError {
        if e.is_timeout() {
            TaskError::service_timeout(&self.name)
        } else {
            TaskError::online_service(&self.name, e.to_string())
        }
    }

    /// Download the current listing
    pub async fn fetch(&self) -> TaskResult<Vec<CatalogItem>> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.map_http_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::online_service(
                &self.name,
                format!("unexpected status {}", status),
            ));
        }

        let listing: CatalogListing = response.json().await.map_err(|e| self.map_http_error(e))?;
        Ok(listing.items)
    }
}

#[async_trait]
impl OnlineService for RemoteCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }

    #[instrument(skip_all, fields(catalog = %self.name))]
    async fn refresh(&self, token: &CancellationToken) -> TaskResult<Vec<ObjectId>> {
        let items = self.fetch().await?;
        debug!(items = items.len(), "Catalog listing received");

        let mut changed = Vec::new();
        for item in &items {
            if token.is_cancelled() {
                break;
            }
            if let Some(id) = self.library.add_online_item(&self.name, &item.url) {
                debug!(title = %item.title, "New catalog item");
                if !changed.contains(&id) {
                    changed.push(id);
                }
            }
        }
        Ok(changed)
    }
}
