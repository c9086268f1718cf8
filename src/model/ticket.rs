use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConnectorError;

/// Format Freshdesk uses for `due_by` in exported ticket data.
pub const DUE_BY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A raw Freshdesk ticket. Field order is kept as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(Map<String, Value>);

impl Ticket {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Numeric ticket id. Numeric strings are accepted as well.
    pub fn id(&self) -> Result<u64, ConnectorError> {
        let id = match self.get("id") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        id.ok_or_else(|| ConnectorError::MissingField {
            ticket: self.label(),
            field: "id",
        })
    }

    pub fn status_code(&self) -> Option<i64> {
        self.get("status").and_then(Value::as_i64)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("subject").and_then(Value::as_str)
    }

    /// Due date, or an error when it is absent or unparseable.
    pub fn due_by(&self) -> Result<DateTime<Utc>, ConnectorError> {
        let raw = self.get("due_by").and_then(Value::as_str);
        raw.and_then(parse_timestamp)
            .ok_or_else(|| ConnectorError::DueDate {
                ticket: self.label(),
                value: raw.unwrap_or("<missing>").to_string(),
            })
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.get("updated_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    }

    fn label(&self) -> String {
        match self.0.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => "<unknown>".to_string(),
        }
    }
}

/// Parse a Freshdesk timestamp. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, DUE_BY_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn status_label(code: i64) -> Option<&'static str> {
    match code {
        2 => Some("Open"),
        3 => Some("Pending, Awaiting Developer Fix"),
        4 => Some("Resolved, Resolved"),
        5 => Some("Closed"),
        6 => Some("Waiting on Customer, Need Additional Information"),
        8 => Some("Monitoring, Under Observation"),
        13 => Some("Update/Upgrade Requested, Upgrade Initiated"),
        14 => Some("Implementation Request, Implementation Request"),
        _ => None,
    }
}
