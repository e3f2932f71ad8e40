pub mod base;
pub mod elcabong_html;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::Result;
use crate::models::ScrapedEvent;

/// A page listing events that the sync cycle can pull from.
#[async_trait]
pub trait EventScraper: Send + Sync {
    fn source_id(&self) -> &'static str;
    fn source_url(&self) -> &str;
    async fn scrape(&self) -> Result<Vec<ScrapedEvent>>;
}

pub fn from_config(config: &AppConfig) -> Result<Box<dyn EventScraper>> {
    Ok(Box::new(elcabong_html::ElCabong::new(config)?))
}
