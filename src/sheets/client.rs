use std::sync::Arc;

use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use super::cache::{CacheKey, SheetCache};
use super::decode::{decode_response, Table};
use super::normalize::Normalizer;
use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::models::{CanonicalEvent, EventRecord};

pub const USER_AGENT: &str = concat!("cabong-agenda/", env!("CARGO_PKG_VERSION"));

/// Reads events from the spreadsheet query endpoint.
///
/// [`SheetClient::fetch`] never fails: page rendering gets fresh rows, the
/// last cached rows, or nothing. [`SheetClient::fetch_canonical`] is used by
/// the sync cycle and reports errors instead.
pub struct SheetClient {
    http: Client,
    base_url: String,
    cache: Arc<SheetCache>,
    normalizer: Normalizer,
}

impl SheetClient {
    pub fn new(config: &AppConfig, cache: Arc<SheetCache>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url: config.sheets_base_url.trim_end_matches('/').to_string(),
            cache,
            normalizer: Normalizer::from_config(config),
        })
    }

    pub async fn fetch(&self, sheet_id: &str, tab_id: &str) -> Vec<EventRecord> {
        let key = CacheKey::new(sheet_id, tab_id);
        // Only informational: every read goes to the network and the cache
        // is the fallback.
        let stale = self.cache.is_stale();
        debug!(%key, stale, "reading sheet");

        match self.fetch_table(sheet_id, tab_id).await {
            Ok(table) => {
                let rows = self.normalizer.normalize_table(&table);
                let version = self.cache.set(key.clone(), rows.clone());
                info!(%key, rows = rows.len(), version, "sheet refreshed");
                rows
            }
            Err(err) => match self.cache.get(&key) {
                Some(entry) => {
                    warn!(%key, version = entry.version, "sheet fetch failed, serving cached rows: {err}");
                    entry.rows
                }
                None => {
                    warn!(%key, "sheet fetch failed, no cached rows: {err}");
                    Vec::new()
                }
            },
        }
    }

    pub async fn fetch_canonical(&self, sheet_id: &str, tab_id: &str) -> Result<Vec<CanonicalEvent>> {
        let table = self.fetch_table(sheet_id, tab_id).await?;
        Ok(self.normalizer.normalize_canonical(&table))
    }

    pub fn invalidate(&self, sheet_id: &str, tab_id: &str) {
        let key = CacheKey::new(sheet_id, tab_id);
        self.cache.invalidate(&key);
        info!(%key, "sheet cache invalidated");
    }

    pub fn query_url(&self, sheet_id: &str, tab_id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}/gviz/tq", self.base_url, sheet_id))
            .map_err(|err| PipelineError::Network(format!("invalid sheet url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("tqx", "out:json")
            .append_pair("gid", tab_id);
        Ok(url)
    }

    async fn fetch_table(&self, sheet_id: &str, tab_id: &str) -> Result<Table> {
        let url = self.query_url(sheet_id, tab_id)?;
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Network(format!("status {status} for {url}")));
        }
        let body = response.text().await?;
        decode_response(&body)
    }
}
