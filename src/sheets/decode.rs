//! Decoder for the spreadsheet query endpoint's wrapped-JSON responses.
//!
//! The endpoint frames its JSON payload as
//! `/*O_o*/\ngoogle.visualization.Query.setResponse({...});` so the body
//! cannot be executed directly as a script.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{PipelineError, Result};

pub const RESPONSE_PREFIX: &str = "/*O_o*/\ngoogle.visualization.Query.setResponse(";
pub const RESPONSE_SUFFIX: &str = ");";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Table {
    #[serde(default)]
    pub cols: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Column {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Row {
    #[serde(default)]
    pub c: Vec<Option<Cell>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Cell {
    #[serde(default)]
    pub v: Option<Value>,
    #[serde(default)]
    pub f: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<EndpointMessage>,
    table: Option<Table>,
}

#[derive(Debug, Deserialize)]
struct EndpointMessage {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    detailed_message: Option<String>,
}

impl Cell {
    /// Display text of the cell: the formatted value when present, otherwise
    /// the raw value rendered as text.
    pub fn text(&self) -> Option<String> {
        if let Some(formatted) = self.f.as_deref() {
            return Some(formatted.trim().to_string());
        }
        self.raw_text()
    }

    pub fn raw_text(&self) -> Option<String> {
        match self.v.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }
}

impl Row {
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.c.get(index).and_then(Option::as_ref)
    }

    /// Trimmed text at `index`, or an empty string for missing cells.
    pub fn text(&self, index: usize) -> String {
        self.cell(index).and_then(Cell::text).unwrap_or_default()
    }
}

impl Table {
    /// Position of the first column whose label matches one of `labels`,
    /// compared case-insensitively.
    pub fn column_index(&self, labels: &[&str]) -> Option<usize> {
        self.cols.iter().position(|col| {
            let label = col.label.trim();
            labels.iter().any(|wanted| label.eq_ignore_ascii_case(wanted))
        })
    }
}

pub fn decode_response(body: &str) -> Result<Table> {
    let framed = body.trim_end();
    let json = framed
        .strip_prefix(RESPONSE_PREFIX)
        .and_then(|rest| rest.strip_suffix(RESPONSE_SUFFIX))
        .ok_or_else(|| {
            let preview: String = framed.chars().take(60).collect();
            PipelineError::Decode(format!("unexpected response framing: {preview:?}"))
        })?;

    let envelope: Envelope =
        serde_json::from_str(json).map_err(|err| PipelineError::Decode(err.to_string()))?;

    if envelope.status.as_deref() == Some("error") {
        let reasons = envelope
            .errors
            .iter()
            .map(|msg| match &msg.detailed_message {
                Some(detail) => format!("{}: {detail}", msg.reason),
                None => msg.reason.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PipelineError::Decode(format!("endpoint error: {reasons}")));
    }

    envelope
        .table
        .ok_or_else(|| PipelineError::Decode("response has no table".to_string()))
}

#[cfg(test)]
pub(crate) fn wrap(json: &str) -> String {
    format!("{RESPONSE_PREFIX}{json}{RESPONSE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{"version":"0.6","reqId":"0","status":"ok","sig":"1","table":{
        "cols":[{"id":"A","label":"Evento","type":"string"},{"id":"B","label":"Data","type":"date","pattern":"dd/MM/yyyy"}],
        "rows":[{"c":[{"v":"Sarau"},{"v":"Date(2024,11,25)","f":"25/12/2024"}]},{"c":[{"v":"Oficina"},null]}],
        "parsedNumHeaders":1}}"#;

    #[test]
    fn prefix_has_fixed_length() {
        assert_eq!(RESPONSE_PREFIX.len(), 47);
        assert_eq!(RESPONSE_SUFFIX.len(), 2);
    }

    #[test]
    fn decodes_wrapped_table() {
        let table = decode_response(&wrap(SAMPLE_JSON)).expect("decode");
        assert_eq!(table.cols.len(), 2);
        assert_eq!(table.cols[1].label, "Data");
        assert_eq!(table.cols[1].kind, "date");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].text(1), "25/12/2024");
        assert_eq!(
            table.rows[0].cell(1).and_then(Cell::raw_text).as_deref(),
            Some("Date(2024,11,25)")
        );
        assert!(table.rows[1].cell(1).is_none());
        assert_eq!(table.rows[1].text(1), "");
        assert_eq!(table.column_index(&["data"]), Some(1));
    }

    #[test]
    fn tolerates_trailing_newline() {
        let body = format!("{}\n", wrap(SAMPLE_JSON));
        assert!(decode_response(&body).is_ok());
    }

    #[test]
    fn html_error_page_is_decode_error() {
        let err = decode_response("<!DOCTYPE html><html><body>Sign in</body></html>")
            .expect_err("html is not a query response");
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn invalid_json_inside_framing_is_decode_error() {
        let err = decode_response(&wrap("{not json")).expect_err("broken json");
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn endpoint_error_status_is_decode_error() {
        let body = wrap(
            r#"{"status":"error","errors":[{"reason":"access_denied","detailed_message":"Sheet is private"}]}"#,
        );
        match decode_response(&body) {
            Err(PipelineError::Decode(msg)) => assert!(msg.contains("Sheet is private")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn numeric_and_bool_cells_render_as_text() {
        let cell = Cell {
            v: Some(serde_json::json!(42)),
            f: None,
        };
        assert_eq!(cell.text().as_deref(), Some("42"));
        let cell = Cell {
            v: Some(serde_json::json!(true)),
            f: None,
        };
        assert_eq!(cell.text().as_deref(), Some("true"));
    }
}
