//! Turns decoded sheet rows into event records.
//!
//! Two layouts are supported. The listing sheet is read by column position;
//! the canonical sheet used by the scrape-merge cycle is read by column label
//! and its date cells may be encoded several different ways.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::decode::{Cell, Row, Table};
use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::models::{CanonicalEvent, CellTime, EventRecord};

const COL_NAME: usize = 0;
const COL_DATE: usize = 1;
const COL_TIME: usize = 2;
const COL_LOCATION: usize = 3;
const COL_TYPE: usize = 4;
const COL_URL: usize = 5;
const COL_FLYER: usize = 6;

const NAME_LABELS: &[&str] = &["event", "evento", "name", "nome"];
const TYPE_LABELS: &[&str] = &["type", "tipo"];
const START_LABELS: &[&str] = &["start", "inicio", "início", "data"];
const END_LABELS: &[&str] = &["end", "fim", "término"];
const LOCATION_LABELS: &[&str] = &["location", "local"];
const DESCRIPTION_LABELS: &[&str] = &["description", "descricao", "descrição"];
const IMAGE_LABELS: &[&str] = &["image", "imagem", "flyer"];
const REGISTRATION_LABELS: &[&str] = &["registration link", "registration_link", "inscrição", "link"];

const DRIVE_PREFIXES: &[&str] = &["https://drive.google.com/", "http://drive.google.com/"];

static DRIVE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/=]([A-Za-z0-9_-]{25,})").expect("valid drive token regex"));
static DATE_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Date\((\d+),(\d+),(\d+)(?:,(\d+),(\d+),(\d+))?\)$")
        .expect("valid date literal regex")
});
static TIME_OF_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid time of day regex"));

/// Which stage of the date fallback chain produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateEncoding {
    Formatted,
    DateLiteral,
    Iso,
    TimeOfDay,
    Raw,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    images_dir: String,
    fallback_image: String,
    timezone: Tz,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl Normalizer {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            images_dir: config.images_dir.trim_end_matches('/').to_string(),
            fallback_image: config.fallback_image.clone(),
            timezone: config.site_timezone(),
        }
    }

    /// Positional layout: name, date, time, location, type, url, flyer.
    pub fn normalize_table(&self, table: &Table) -> Vec<EventRecord> {
        table
            .rows
            .iter()
            .filter_map(|row| self.normalize_row(row))
            .collect()
    }

    pub fn normalize_row(&self, row: &Row) -> Option<EventRecord> {
        let name = row.text(COL_NAME);
        if name.is_empty() {
            return None;
        }

        let date_text = row.text(COL_DATE);
        let date = match parse_day_month_year(&date_text) {
            Ok(date) => Some(date),
            Err(err) => {
                debug!(event = %name, "{err}");
                None
            }
        };

        let time_text = row.text(COL_TIME);
        let time = if time_text.is_empty() {
            None
        } else {
            match parse_hour_minute(&time_text) {
                Ok(time) => Some(time),
                Err(err) => {
                    debug!(event = %name, "{err}");
                    None
                }
            }
        };

        let start_time = date.map(|date| {
            let time_of_day = time.unwrap_or(NaiveTime::MIN);
            Utc.from_utc_datetime(&date.and_time(time_of_day))
        });

        let url = row.text(COL_URL);

        Some(EventRecord {
            name,
            tags: split_tags(&row.text(COL_TYPE)),
            start_time,
            end_time: None,
            location: row.text(COL_LOCATION),
            description: String::new(),
            image_url: self.image_url(&row.text(COL_FLYER)),
            registration_link: (!url.is_empty()).then_some(url),
            time: time.map(|t| t.format("%H:%M").to_string()),
        })
    }

    /// Label-indexed layout of the canonical sheet.
    pub fn normalize_canonical(&self, table: &Table) -> Vec<CanonicalEvent> {
        let today = Utc::now().with_timezone(&self.timezone).date_naive();
        self.normalize_canonical_on(table, today)
    }

    pub fn normalize_canonical_on(&self, table: &Table, today: NaiveDate) -> Vec<CanonicalEvent> {
        let name_col = table.column_index(NAME_LABELS);
        let type_col = table.column_index(TYPE_LABELS);
        let start_col = table.column_index(START_LABELS);
        let end_col = table.column_index(END_LABELS);
        let location_col = table.column_index(LOCATION_LABELS);
        let description_col = table.column_index(DESCRIPTION_LABELS);
        let image_col = table.column_index(IMAGE_LABELS);
        let registration_col = table.column_index(REGISTRATION_LABELS);

        if name_col.is_none() {
            debug!("canonical sheet has no event name column");
        }

        let text = |row: &Row, col: Option<usize>| col.map(|i| row.text(i)).unwrap_or_default();
        let when = |row: &Row, col: Option<usize>| {
            col.and_then(|i| row.cell(i))
                .and_then(|cell| parse_cell_time(cell, today))
        };

        table
            .rows
            .iter()
            .filter_map(|row| {
                let name = text(row, name_col);
                if name.is_empty() {
                    return None;
                }
                let registration = text(row, registration_col);
                Some(CanonicalEvent {
                    name,
                    tags: split_tags(&text(row, type_col)),
                    start: when(row, start_col),
                    end: when(row, end_col),
                    location: text(row, location_col),
                    description: text(row, description_col),
                    image_url: self.image_url(&text(row, image_col)),
                    registration_link: (!registration.is_empty()).then_some(registration),
                })
            })
            .collect()
    }

    /// Resolves a flyer reference into something a page can load.
    pub fn image_url(&self, reference: &str) -> String {
        let reference = reference.trim();
        if reference.is_empty() {
            return self.fallback_image.clone();
        }
        if DRIVE_PREFIXES.iter().any(|prefix| reference.starts_with(prefix)) {
            return match drive_file_id(reference) {
                Some(id) => format!("https://lh3.googleusercontent.com/d/{id}"),
                None => reference.to_string(),
            };
        }
        if reference.starts_with("http://")
            || reference.starts_with("https://")
            || reference.starts_with('/')
        {
            return reference.to_string();
        }
        format!("{}/{}", self.images_dir, reference)
    }
}

pub fn drive_file_id(url: &str) -> Option<&str> {
    DRIVE_TOKEN_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `DD/MM/YYYY` into a calendar date.
pub fn parse_day_month_year(text: &str) -> Result<NaiveDate> {
    let invalid = || PipelineError::Parse(format!("invalid date {text:?}"));
    let parts: Vec<&str> = text.trim().split('/').collect();
    if parts.len() != 3 {
        return Err(invalid());
    }
    let day: u32 = parse_number(parts[0]).ok_or_else(invalid)?;
    let month: u32 = parse_number(parts[1]).ok_or_else(invalid)?;
    let year: i32 = parse_number(parts[2]).ok_or_else(invalid)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// `HH:MM` (extra `:SS` ignored) into a time of day.
pub fn parse_hour_minute(text: &str) -> Result<NaiveTime> {
    let invalid = || PipelineError::Parse(format!("invalid time {text:?}"));
    let mut parts = text.trim().split(':');
    let hour: u32 = parts.next().and_then(parse_number).ok_or_else(invalid)?;
    let minute: u32 = parts.next().and_then(parse_number).ok_or_else(invalid)?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

fn parse_number<T: std::str::FromStr>(part: &str) -> Option<T> {
    let part = part.trim();
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

pub fn split_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs a date cell through the fallback chain. Empty cells yield `None`;
/// anything else yields some value.
pub fn parse_cell_time(cell: &Cell, today: NaiveDate) -> Option<CellTime> {
    decode_cell_time(cell, today).map(|(_, value)| value)
}

pub fn decode_cell_time(cell: &Cell, today: NaiveDate) -> Option<(DateEncoding, CellTime)> {
    if let Some(ts) = cell.f.as_deref().and_then(parse_formatted) {
        return Some((DateEncoding::Formatted, CellTime::Timestamp(ts)));
    }

    let raw = cell
        .raw_text()
        .or_else(|| cell.f.as_deref().map(|f| f.trim().to_string()))
        .filter(|raw| !raw.is_empty())?;

    if let Some(ts) = parse_date_literal(&raw) {
        return Some((DateEncoding::DateLiteral, CellTime::Timestamp(ts)));
    }
    if let Some(ts) = parse_iso(&raw) {
        return Some((DateEncoding::Iso, CellTime::Timestamp(ts)));
    }
    if let Some(ts) = parse_time_of_day(&raw, today) {
        return Some((DateEncoding::TimeOfDay, CellTime::Timestamp(ts)));
    }
    Some((DateEncoding::Raw, CellTime::Raw(raw)))
}

/// `DD/MM/YYYY HH:MM[:SS]`. A date-only display string is not accepted here
/// so the time carried by the raw value is not lost.
fn parse_formatted(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `Date(2024,11,25,20,0,0)`; the month is zero-based.
fn parse_date_literal(text: &str) -> Option<DateTime<Utc>> {
    let caps = DATE_LITERAL_RE.captures(text)?;
    let field = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(2)? + 1, field(3)?)?;
    let time = NaiveTime::from_hms_opt(field(4)?, field(5)?, field(6)?)?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

fn parse_time_of_day(text: &str, today: NaiveDate) -> Option<DateTime<Utc>> {
    let caps = TIME_OF_DAY_RE.captures(text)?;
    let hour = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps.get(2)?.as_str().parse().ok()?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&today.and_time(time)))
}
