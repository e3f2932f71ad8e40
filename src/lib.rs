//! Event listings for the El Cabong agenda: read from a published spreadsheet,
//! topped up by scraping the venue's agenda page, and written back.

pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod scraping;
pub mod server;
pub mod sheets;
mod utils;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use models::{CanonicalEvent, CellTime, EventRecord, ScrapedEvent, SheetRow};
pub use pipeline::{CycleReport, Pipeline};
