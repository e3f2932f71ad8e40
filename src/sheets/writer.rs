use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::models::SheetRow;
use crate::sheets::client::USER_AGENT;

/// Destination for rows appended to the canonical sheet.
#[async_trait]
pub trait SheetWriter: Send + Sync {
    fn name(&self) -> &'static str;
    async fn append(&self, rows: &[SheetRow]) -> Result<usize>;
}

/// Records what would be appended without persisting anything.
pub struct LogWriter {
    sheet_id: String,
    tab_id: String,
}

impl LogWriter {
    pub fn new(sheet_id: &str, tab_id: &str) -> Self {
        Self {
            sheet_id: sheet_id.to_string(),
            tab_id: tab_id.to_string(),
        }
    }
}

#[async_trait]
impl SheetWriter for LogWriter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn append(&self, rows: &[SheetRow]) -> Result<usize> {
        for row in rows {
            info!(
                sheet = %self.sheet_id,
                tab = %self.tab_id,
                event = %row.event,
                start = %row.start,
                "would append row"
            );
        }
        Ok(rows.len())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendRequest<'a> {
    sheet_id: &'a str,
    tab_id: &'a str,
    rows: &'a [SheetRow],
}

/// Posts rows as JSON to a web endpoint (e.g. a script bound to the sheet)
/// that performs the actual append.
pub struct WebhookWriter {
    http: Client,
    url: String,
    sheet_id: String,
    tab_id: String,
}

impl WebhookWriter {
    pub fn new(config: &AppConfig, url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        let (sheet_id, tab_id) = config.canonical_sheet();
        Ok(Self {
            http,
            url: url.to_string(),
            sheet_id: sheet_id.to_string(),
            tab_id: tab_id.to_string(),
        })
    }
}

#[async_trait]
impl SheetWriter for WebhookWriter {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn append(&self, rows: &[SheetRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let payload = AppendRequest {
            sheet_id: &self.sheet_id,
            tab_id: &self.tab_id,
            rows,
        };
        let response = self.http.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Write(format!("status {status}: {body}")));
        }
        info!(rows = rows.len(), url = %self.url, "rows appended");
        Ok(rows.len())
    }
}

/// Picks the webhook writer when a URL is configured, the log writer otherwise.
pub fn from_config(config: &AppConfig) -> Result<Box<dyn SheetWriter>> {
    match config.writer_webhook_url.as_deref() {
        Some(url) => Ok(Box::new(WebhookWriter::new(config, url)?)),
        None => {
            let (sheet_id, tab_id) = config.canonical_sheet();
            Ok(Box::new(LogWriter::new(sheet_id, tab_id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> SheetRow {
        SheetRow {
            event: name.to_string(),
            kind: String::new(),
            start: "2024-01-01T20:00:00Z".to_string(),
            end: "2024-01-01T20:00:00Z".to_string(),
            location: "El Cabong".to_string(),
            description: String::new(),
            image: "/images/fallback.jpg".to_string(),
            registration_link: String::new(),
        }
    }

    #[tokio::test]
    async fn log_writer_reports_every_row() {
        let writer = LogWriter::new("sheet", "0");
        assert_eq!(writer.append(&[row("A"), row("B")]).await.expect("append"), 2);
    }

    #[test]
    fn writer_choice_follows_config() {
        let config = AppConfig::default();
        assert_eq!(from_config(&config).expect("writer").name(), "log");

        let config = AppConfig {
            writer_webhook_url: Some("https://script.example.org/exec".into()),
            ..AppConfig::default()
        };
        assert_eq!(from_config(&config).expect("writer").name(), "webhook");
    }

    #[tokio::test]
    async fn webhook_skips_empty_batches() {
        let config = AppConfig::default();
        let writer = WebhookWriter::new(&config, "http://127.0.0.1:9/append").expect("writer");
        assert_eq!(writer.append(&[]).await.expect("no request made"), 0);
    }

    #[tokio::test]
    async fn webhook_network_failure_propagates() {
        let config = AppConfig {
            http_timeout_secs: 2,
            ..AppConfig::default()
        };
        let writer = WebhookWriter::new(&config, "http://127.0.0.1:9/append").expect("writer");
        let err = writer.append(&[row("A")]).await.expect_err("offline");
        assert!(matches!(err, PipelineError::Network(_)));
    }
}
