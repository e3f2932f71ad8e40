use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::utils;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";
pub const DEFAULT_SCRAPE_URL: &str = "https://elcabong.com.br/agenda/";
pub const DEFAULT_IMAGES_DIR: &str = "/images";
pub const DEFAULT_FALLBACK_IMAGE: &str = "/images/fallback.jpg";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Sheet rendered on the site.
    pub sheet_id: String,
    pub tab_id: String,
    /// Sheet the scrape-merge cycle deduplicates against and appends to.
    /// Falls back to the listing sheet when unset.
    pub canonical_sheet_id: Option<String>,
    pub canonical_tab_id: Option<String>,
    pub sheets_base_url: String,
    pub scrape_url: String,
    pub listen_addr: String,
    pub http_timeout_secs: u64,
    pub cycle_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub images_dir: String,
    pub fallback_image: String,
    pub writer_webhook_url: Option<String>,
    pub timezone: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sheet_id: String::new(),
            tab_id: "0".to_string(),
            canonical_sheet_id: None,
            canonical_tab_id: None,
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            scrape_url: DEFAULT_SCRAPE_URL.to_string(),
            listen_addr: "127.0.0.1:8080".to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            cycle_timeout_secs: DEFAULT_CYCLE_TIMEOUT_SECS,
            poll_interval_secs: 60,
            images_dir: DEFAULT_IMAGES_DIR.to_string(),
            fallback_image: DEFAULT_FALLBACK_IMAGE.to_string(),
            writer_webhook_url: None,
            timezone: "America/Sao_Paulo".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the JSON config file (if any) and applies environment overrides.
    /// A zero timeout from either source falls back to its default.
    pub fn load() -> Result<Self> {
        let path = utils::config_path();
        let mut config = read_config(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("SHEET_ID") {
            self.sheet_id = value;
        }
        if let Some(value) = get("SHEET_TAB_ID") {
            self.tab_id = value;
        }
        if let Some(value) = get("CANONICAL_SHEET_ID") {
            self.canonical_sheet_id = Some(value);
        }
        if let Some(value) = get("CANONICAL_TAB_ID") {
            self.canonical_tab_id = Some(value);
        }
        if let Some(value) = get("SHEETS_BASE_URL") {
            self.sheets_base_url = value;
        }
        if let Some(value) = get("SCRAPE_URL") {
            self.scrape_url = value;
        }
        if let Some(value) = get("LISTEN_ADDR") {
            self.listen_addr = value;
        }
        if let Some(value) = get("HTTP_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.http_timeout_secs = value;
        }
        if let Some(value) = get("CYCLE_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.cycle_timeout_secs = value;
        }
        if let Some(value) = get("POLL_INTERVAL_SECS").and_then(|s| s.parse().ok()) {
            self.poll_interval_secs = value;
        }
        if let Some(value) = get("WRITER_WEBHOOK_URL") {
            self.writer_webhook_url = Some(value);
        }
        if let Some(value) = get("SITE_TIMEZONE") {
            self.timezone = value;
        }

        if self.http_timeout_secs == 0 {
            tracing::warn!("http_timeout_secs is 0, using {DEFAULT_HTTP_TIMEOUT_SECS}");
            self.http_timeout_secs = DEFAULT_HTTP_TIMEOUT_SECS;
        }
        if self.cycle_timeout_secs == 0 {
            tracing::warn!("cycle_timeout_secs is 0, using {DEFAULT_CYCLE_TIMEOUT_SECS}");
            self.cycle_timeout_secs = DEFAULT_CYCLE_TIMEOUT_SECS;
        }
    }

    pub fn canonical_sheet(&self) -> (&str, &str) {
        (
            self.canonical_sheet_id.as_deref().unwrap_or(&self.sheet_id),
            self.canonical_tab_id.as_deref().unwrap_or(&self.tab_id),
        )
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn site_timezone(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!(timezone = %self.timezone, "unknown timezone, using UTC");
            Tz::UTC
        })
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read config {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid config json in {}", path.display()))
}
