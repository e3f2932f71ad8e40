use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::merge;
use crate::models::EventRecord;
use crate::scraping::{self, EventScraper};
use crate::sheets::{self, SheetCache, SheetClient, SheetWriter};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub scraped: usize,
    pub canonical: usize,
    pub new_events: usize,
}

/// Everything a request needs, built once at startup and shared.
pub struct Pipeline {
    config: AppConfig,
    sheets: SheetClient,
    scraper: Box<dyn EventScraper>,
    writer: Box<dyn SheetWriter>,
}

impl Pipeline {
    pub fn from_config(config: AppConfig, cache: Arc<SheetCache>) -> Result<Self> {
        let client = SheetClient::new(&config, cache)?;
        let scraper = scraping::from_config(&config)?;
        let writer = sheets::writer::from_config(&config)?;
        Ok(Self::with_parts(config, client, scraper, writer))
    }

    pub fn with_parts(
        config: AppConfig,
        sheets: SheetClient,
        scraper: Box<dyn EventScraper>,
        writer: Box<dyn SheetWriter>,
    ) -> Self {
        Self {
            config,
            sheets,
            scraper,
            writer,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Events shown on the site. Never fails; see [`SheetClient::fetch`].
    pub async fn listing(&self) -> Vec<EventRecord> {
        self.sheets
            .fetch(&self.config.sheet_id, &self.config.tab_id)
            .await
    }

    pub fn invalidate_listing(&self) {
        self.sheets.invalidate(&self.config.sheet_id, &self.config.tab_id);
    }

    /// One scrape-merge-write cycle, bounded by the configured cycle timeout.
    pub async fn sync(&self) -> Result<CycleReport> {
        let limit = self.config.cycle_timeout();
        let (sheet_id, tab_id) = self.config.canonical_sheet();
        let cycle = run_cycle(
            self.scraper.as_ref(),
            &self.sheets,
            self.writer.as_ref(),
            sheet_id,
            tab_id,
        );
        tokio::time::timeout(limit, cycle).await.map_err(|_| {
            PipelineError::Network(format!("sync cycle timed out after {}s", limit.as_secs()))
        })?
    }
}

#[instrument(
    skip_all,
    fields(source = scraper.source_id(), url = scraper.source_url(), writer = writer.name())
)]
pub async fn run_cycle(
    scraper: &dyn EventScraper,
    sheets: &SheetClient,
    writer: &dyn SheetWriter,
    sheet_id: &str,
    tab_id: &str,
) -> Result<CycleReport> {
    let scraped = scraper.scrape().await?;
    let canonical = sheets.fetch_canonical(sheet_id, tab_id).await?;
    let delta = merge::compute_delta(&scraped, &canonical);
    info!(
        scraped = scraped.len(),
        canonical = canonical.len(),
        new_events = delta.len(),
        "delta computed"
    );

    let written = if delta.is_empty() {
        0
    } else {
        writer.append(&delta).await?
    };

    Ok(CycleReport {
        scraped: scraped.len(),
        canonical: canonical.len(),
        new_events: written,
    })
}
