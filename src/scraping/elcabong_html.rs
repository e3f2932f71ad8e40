use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::base;
use super::EventScraper;
use crate::config::AppConfig;
use crate::error::Result;
use crate::models::ScrapedEvent;
use crate::sheets::client::USER_AGENT;

const SOURCE_ID: &str = "elcabong";
const LOCATION: &str = "El Cabong";

static CARD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event-item").expect("elcabong card selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event-title").expect("elcabong title"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event-date").expect("elcabong date"));
static DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event-description").expect("elcabong description"));
static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event-image img, img").expect("elcabong image"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.event-link").expect("elcabong link"));

pub struct ElCabong {
    http: Client,
    url: String,
    default_image: String,
}

#[async_trait]
impl EventScraper for ElCabong {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    async fn scrape(&self) -> Result<Vec<ScrapedEvent>> {
        let html = base::fetch_html(&self.http, &self.url).await?;
        let events = self.parse_document(&html)?;
        info!(source = SOURCE_ID, events = events.len(), "page scraped");
        Ok(events)
    }
}

impl ElCabong {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            url: config.scrape_url.clone(),
            default_image: config.fallback_image.clone(),
        })
    }

    pub(crate) fn parse_document(&self, html: &str) -> Result<Vec<ScrapedEvent>> {
        let document = Html::parse_document(html);
        let mut events = Vec::new();

        for card in document.select(&CARD_SELECTOR) {
            let name = match base::first_text(&card, &TITLE_SELECTOR) {
                Some(text) => text,
                None => {
                    warn!(source = SOURCE_ID, "event card without a title, skipping");
                    continue;
                }
            };

            let date_text = base::first_text(&card, &DATE_SELECTOR).unwrap_or_default();
            // End times are not published on the page, so an event ends when it starts.
            let start = match parse_listing_datetime(&date_text) {
                Some(dt) => dt,
                None => {
                    warn!(source = SOURCE_ID, event = %name, date = %date_text, "unparseable event date, skipping");
                    continue;
                }
            };

            let image_url = base::absolute_url(
                &self.url,
                base::first_attr(&card, &IMAGE_SELECTOR, "src"),
            )
            .unwrap_or_else(|| self.default_image.clone());
            let registration_link =
                base::absolute_url(&self.url, base::first_attr(&card, &LINK_SELECTOR, "href"));

            events.push(ScrapedEvent {
                name,
                start_time: start,
                end_time: start,
                location: LOCATION.to_string(),
                description: base::first_text(&card, &DESCRIPTION_SELECTOR).unwrap_or_default(),
                image_url,
                registration_link,
            });
        }

        base::fail_if_empty(SOURCE_ID, events)
    }
}

/// `YYYY-MM-DD HH:MM` as shown on the agenda, read as UTC.
fn parse_listing_datetime(text: &str) -> Option<DateTime<Utc>> {
    let (date, time) = text.trim().split_once(' ')?;
    let time = time.trim();
    [format!("{date}T{time}:00Z"), format!("{date}T{time}Z")]
        .iter()
        .find_map(|candidate| DateTime::parse_from_rfc3339(candidate).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use chrono::TimeZone;

    const SAMPLE_HTML: &str = r#"
    <html><body>
    <section class="agenda">
      <div class="event-item">
        <div class="event-image"><img src="/wp-content/uploads/show-x.jpg" alt=""></div>
        <h3 class="event-title">Show X</h3>
        <span class="event-date">2024-01-01 20:00</span>
        <p class="event-description">Noite de
           forró pé de serra.</p>
        <a class="event-link" href="https://sympla.com.br/show-x">Ingressos</a>
      </div>
      <div class="event-item">
        <h3 class="event-title">Oficina de Percussão</h3>
        <span class="event-date">2024-01-05 14:30:00</span>
      </div>
      <div class="event-item">
        <h3 class="event-title">Data a definir</h3>
        <span class="event-date">em breve</span>
      </div>
      <div class="event-item">
        <span class="event-date">2024-01-06 19:00</span>
      </div>
    </section>
    </body></html>
    "#;

    fn scraper() -> ElCabong {
        ElCabong::new(&AppConfig::default()).expect("scraper")
    }

    #[test]
    fn parses_agenda_cards() {
        let events = scraper().parse_document(SAMPLE_HTML).expect("parse agenda");
        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.name, "Show X");
        assert_eq!(
            first.start_time,
            Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap()
        );
        assert_eq!(first.end_time, first.start_time);
        assert_eq!(first.location, "El Cabong");
        assert_eq!(first.description, "Noite de forró pé de serra.");
        assert_eq!(
            first.image_url,
            "https://elcabong.com.br/wp-content/uploads/show-x.jpg"
        );
        assert_eq!(
            first.registration_link.as_deref(),
            Some("https://sympla.com.br/show-x")
        );

        let second = &events[1];
        assert_eq!(
            second.start_time,
            Utc.with_ymd_and_hms(2024, 1, 5, 14, 30, 0).unwrap()
        );
        assert_eq!(second.image_url, "/images/fallback.jpg");
        assert_eq!(second.description, "");
        assert_eq!(second.registration_link, None);
    }

    #[test]
    fn reports_configured_page() {
        let config = AppConfig {
            scrape_url: "http://127.0.0.1:9/agenda/".into(),
            ..AppConfig::default()
        };
        let scraper = ElCabong::new(&config).expect("scraper");
        assert_eq!(scraper.source_id(), SOURCE_ID);
        assert_eq!(scraper.source_url(), "http://127.0.0.1:9/agenda/");
    }

    #[test]
    fn page_without_events_is_a_scrape_error() {
        let err = scraper()
            .parse_document("<html><body><p>Em manutenção</p></body></html>")
            .expect_err("no cards");
        assert!(matches!(err, PipelineError::Scrape(_)));
    }

    #[test]
    fn listing_datetime_needs_date_and_time() {
        assert_eq!(
            parse_listing_datetime("2024-12-25 20:00"),
            Some(Utc.with_ymd_and_hms(2024, 12, 25, 20, 0, 0).unwrap())
        );
        assert_eq!(parse_listing_datetime("2024-12-25"), None);
        assert_eq!(parse_listing_datetime("25/12/2024 20:00"), None);
    }
}
