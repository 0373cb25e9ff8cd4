use crate::clock::Clock;
use crate::config::ReconcileConfig;
use crate::document::LiveDocument;
use crate::error::AppError;
use crate::navigation::{cache_bust_value, CACHE_BUST_PARAM};
use crate::source;
use crate::token::VersionToken;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Retrieves the latest deployed entry document.
#[async_trait]
pub trait EntryFetcher: Send + Sync {
    async fn fetch_entry(&self) -> Result<String, AppError>;
}

/// Fetches the entry document over HTTP, bypassing every cache layer.
pub struct HttpEntryFetcher {
    entry_url: Url,
    clock: Arc<dyn Clock>,
    http: Client,
}

impl HttpEntryFetcher {
    pub fn new(
        site_url: &str,
        config: &ReconcileConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let base = Url::parse(site_url)
            .map_err(|e| AppError::Config(format!("Invalid site URL {site_url:?}: {e}")))?;
        let entry_url = base
            .join(&config.entry_path)
            .map_err(|e| AppError::Config(format!("Invalid entry path {:?}: {e}", config.entry_path)))?;

        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            entry_url,
            clock,
            http,
        })
    }

    /// Swap in a preconfigured HTTP client.
    pub fn with_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn entry_url(&self) -> &Url {
        &self.entry_url
    }
}

#[async_trait]
impl EntryFetcher for HttpEntryFetcher {
    async fn fetch_entry(&self) -> Result<String, AppError> {
        let mut url = self.entry_url.clone();
        url.query_pairs_mut()
            .append_pair(CACHE_BUST_PARAM, &cache_bust_value(self.clock.as_ref()));

        let resp = self
            .http
            .get(url)
            .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("Entry document request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Http {
                status: resp.status().as_u16(),
            });
        }

        resp.text()
            .await
            .map_err(|e| AppError::Fetch(format!("Failed to read entry document: {e}")))
    }
}

/// Outcome of comparing the running version against the deployed one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCheck {
    pub needs_refresh: bool,
    pub running_version: Option<VersionToken>,
    pub latest_version: Option<VersionToken>,
}

impl VersionCheck {
    fn skipped(running_version: Option<VersionToken>) -> Self {
        Self {
            needs_refresh: false,
            running_version,
            latest_version: None,
        }
    }
}

/// Compares the live page's version with the freshly deployed entry document.
///
/// Every failure resolves to "no refresh": a missed update is acceptable,
/// a spurious reload loop is not.
pub struct VersionComparator {
    document: Arc<dyn LiveDocument>,
    fetcher: Arc<dyn EntryFetcher>,
}

impl VersionComparator {
    pub fn new(document: Arc<dyn LiveDocument>, fetcher: Arc<dyn EntryFetcher>) -> Self {
        Self { document, fetcher }
    }

    pub async fn check_version(&self) -> VersionCheck {
        let Some(running) = source::read_from_live_document(self.document.as_ref()) else {
            info!("Running version unknown, skipping update check");
            return VersionCheck::skipped(None);
        };

        let html = match self.fetcher.fetch_entry().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Update check fetch failed: {e}");
                return VersionCheck::skipped(Some(running));
            }
        };

        let Some(latest) = source::read_from_html_text(&html) else {
            info!("Latest version unknown, skipping update check");
            return VersionCheck::skipped(Some(running));
        };

        let needs_refresh = running != latest;
        if needs_refresh {
            info!("Running version {running} is stale, latest is {latest}");
        } else {
            info!("Running version {running} is current");
        }

        VersionCheck {
            needs_refresh,
            running_version: Some(running),
            latest_version: Some(latest),
        }
    }
}
