use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub name: String,
    pub tags: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: String,
    pub description: String,
    pub image_url: String,
    pub registration_link: Option<String>,
    /// Zero-padded `HH:MM` as typed in the sheet.
    pub time: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedEvent {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub description: String,
    pub image_url: String,
    pub registration_link: Option<String>,
}

/// A date cell after the fallback chain. Cells that match no known encoding
/// keep their text so nothing typed into the sheet is lost.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum CellTime {
    Timestamp(DateTime<Utc>),
    Raw(String),
}

impl CellTime {
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            CellTime::Timestamp(ts) => Some(*ts),
            CellTime::Raw(_) => None,
        }
    }

    /// Representation used when comparing start times across sources.
    pub fn comparable(&self) -> String {
        match self {
            CellTime::Timestamp(ts) => format_timestamp(ts),
            CellTime::Raw(raw) => raw.trim().to_string(),
        }
    }
}

/// Event as stored in the canonical sheet, read by column label.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEvent {
    pub name: String,
    pub tags: Vec<String>,
    pub start: Option<CellTime>,
    pub end: Option<CellTime>,
    pub location: String,
    pub description: String,
    pub image_url: String,
    pub registration_link: Option<String>,
}

/// Row ready to be appended to the canonical sheet, keyed by its column names.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SheetRow {
    pub event: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub description: String,
    pub image: String,
    pub registration_link: String,
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn comparable_forms_agree_for_the_same_instant() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap();
        assert_eq!(CellTime::Timestamp(ts).comparable(), "2024-01-01T20:00:00Z");
        assert_eq!(
            CellTime::Raw(" 2024-01-01T20:00:00Z ".into()).comparable(),
            "2024-01-01T20:00:00Z"
        );
    }

    #[test]
    fn sheet_row_uses_sheet_column_names() {
        let row = SheetRow {
            event: "Show X".into(),
            kind: "Música, Teatro".into(),
            start: "2024-01-01T20:00:00Z".into(),
            end: "2024-01-01T20:00:00Z".into(),
            location: "El Cabong".into(),
            description: String::new(),
            image: "/images/fallback.jpg".into(),
            registration_link: String::new(),
        };
        let value = serde_json::to_value(&row).expect("serialize row");
        assert_eq!(value["type"], "Música, Teatro");
        assert_eq!(value["registration_link"], "");
        assert_eq!(value["event"], "Show X");
    }
}
