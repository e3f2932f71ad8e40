//! Works out which scraped events are missing from the canonical sheet.
//!
//! Two events are the same when their names match exactly and their start
//! times render to the same RFC 3339 UTC string. Canonical cells that never
//! parsed as a date are compared by their trimmed text.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::models::{format_timestamp, CanonicalEvent, ScrapedEvent, SheetRow};

pub fn event_fingerprint(name: &str, start: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    hasher.update(start.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn canonical_fingerprint(event: &CanonicalEvent) -> String {
    let start = event
        .start
        .as_ref()
        .map(|start| start.comparable())
        .unwrap_or_default();
    event_fingerprint(&event.name, &start)
}

pub fn compute_delta(scraped: &[ScrapedEvent], canonical: &[CanonicalEvent]) -> Vec<SheetRow> {
    let mut seen: HashSet<String> = canonical.iter().map(canonical_fingerprint).collect();
    let mut delta = Vec::new();

    for event in scraped {
        let start = format_timestamp(&event.start_time);
        if !seen.insert(event_fingerprint(&event.name, &start)) {
            debug!(event = %event.name, %start, "already in canonical sheet");
            continue;
        }
        delta.push(to_sheet_row(event));
    }

    delta
}

pub fn to_sheet_row(event: &ScrapedEvent) -> SheetRow {
    SheetRow {
        event: event.name.clone(),
        // the agenda page has no categories; editors tag rows in the sheet
        kind: String::new(),
        start: format_timestamp(&event.start_time),
        end: format_timestamp(&event.end_time),
        location: event.location.clone(),
        description: event.description.clone(),
        image: event.image_url.clone(),
        registration_link: event.registration_link.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellTime;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    fn scraped(name: &str, start: DateTime<Utc>) -> ScrapedEvent {
        ScrapedEvent {
            name: name.to_string(),
            start_time: start,
            end_time: start,
            location: "El Cabong".to_string(),
            description: "Forró".to_string(),
            image_url: "https://elcabong.com.br/show.jpg".to_string(),
            registration_link: None,
        }
    }

    fn canonical(name: &str, start: Option<CellTime>) -> CanonicalEvent {
        CanonicalEvent {
            name: name.to_string(),
            tags: vec!["Música".to_string()],
            start,
            end: None,
            location: "El Cabong".to_string(),
            description: String::new(),
            image_url: "/images/fallback.jpg".to_string(),
            registration_link: None,
        }
    }

    #[test]
    fn known_event_is_excluded() {
        let sheet = vec![canonical("Show X", Some(CellTime::Timestamp(at(20))))];
        assert!(compute_delta(&[scraped("Show X", at(20))], &sheet).is_empty());
    }

    #[test]
    fn changed_name_or_start_is_included() {
        let sheet = vec![canonical("Show X", Some(CellTime::Timestamp(at(20))))];
        let delta = compute_delta(
            &[scraped("Show Y", at(20)), scraped("Show X", at(21))],
            &sheet,
        );
        let names: Vec<_> = delta.iter().map(|row| row.event.as_str()).collect();
        assert_eq!(names, vec!["Show Y", "Show X"]);
        assert_eq!(delta[1].start, "2024-01-01T21:00:00Z");
    }

    #[test]
    fn iso_text_in_sheet_matches_timestamp() {
        let sheet = vec![canonical(
            "Show X",
            Some(CellTime::Raw("2024-01-01T20:00:00Z".into())),
        )];
        assert!(compute_delta(&[scraped("Show X", at(20))], &sheet).is_empty());
    }

    #[test]
    fn name_match_is_exact() {
        let sheet = vec![canonical("show x", Some(CellTime::Timestamp(at(20))))];
        assert_eq!(compute_delta(&[scraped("Show X", at(20))], &sheet).len(), 1);
    }

    #[test]
    fn canonical_rows_without_start_never_match() {
        let sheet = vec![canonical("Show X", None)];
        assert_eq!(compute_delta(&[scraped("Show X", at(20))], &sheet).len(), 1);
    }

    #[test]
    fn repeated_scraped_events_are_appended_once() {
        let delta = compute_delta(&[scraped("Show X", at(20)), scraped("Show X", at(20))], &[]);
        assert_eq!(delta.len(), 1);
    }

    #[test]
    fn rows_follow_sheet_schema() {
        let mut event = scraped("Show X", at(20));
        event.registration_link = Some("https://sympla.com.br/x".into());
        let row = to_sheet_row(&event);
        assert_eq!(row.event, "Show X");
        assert_eq!(row.kind, "");
        assert_eq!(row.start, "2024-01-01T20:00:00Z");
        assert_eq!(row.end, row.start);
        assert_eq!(row.location, "El Cabong");
        assert_eq!(row.description, "Forró");
        assert_eq!(row.image, "https://elcabong.com.br/show.jpg");
        assert_eq!(row.registration_link, "https://sympla.com.br/x");
        assert_eq!(to_sheet_row(&scraped("Y", at(1))).registration_link, "");
    }
}
