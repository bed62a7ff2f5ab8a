//! Result rendering
//!
//! Builds the summary-card document for a completed flow. `render` is a pure
//! function: every call assembles a fresh document from the record, so
//! concurrent conversations can never observe each other's fields through a
//! shared template.

use std::fmt;
use std::str::FromStr;

use serde_json::{Value, json};

use crate::error::DialogError;
use crate::value_objects::CollectedRecord;

/// Which summary template a completed record populates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryKind {
    Laptop,
    Trip,
    Profile,
}

impl SummaryKind {
    /// Wire name of the kind, as carried in completion records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Laptop => "laptop-summary",
            Self::Trip => "trip-summary",
            Self::Profile => "profile-summary",
        }
    }

    /// Display title of the rendered card
    fn title(&self) -> &'static str {
        match self {
            Self::Laptop => "Laptop request",
            Self::Trip => "Trip plan",
            Self::Profile => "User profile",
        }
    }

    /// Record fields in their fixed display order, with row labels
    ///
    /// The order is part of the external contract: each kind fills its
    /// display slots in exactly this sequence.
    fn fields(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Laptop => &[
                ("company", "Company"),
                ("colour", "Colour"),
                ("purpose", "Purpose"),
                ("budget", "Budget"),
            ],
            Self::Trip => &[
                ("country", "Country"),
                ("state", "State"),
                ("duration", "Duration"),
                ("budget", "Budget"),
            ],
            Self::Profile => &[
                ("name", "Name"),
                ("gender", "Gender"),
                ("dob", "Date of birth"),
                ("marital_status", "Marital status"),
            ],
        }
    }
}

impl FromStr for SummaryKind {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "laptop-summary" => Ok(Self::Laptop),
            "trip-summary" => Ok(Self::Trip),
            "profile-summary" => Ok(Self::Profile),
            other => Err(DialogError::UnknownSummaryKind(other.to_string())),
        }
    }
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a fresh summary-card document for the record
pub fn render(kind: SummaryKind, record: &CollectedRecord) -> Value {
    let body: Vec<Value> = kind
        .fields()
        .iter()
        .map(|(field, label)| {
            json!({
                "type": "ColumnSet",
                "columns": [
                    { "type": "Column", "items": [{ "type": "TextBlock", "weight": "Bolder", "text": label }] },
                    { "type": "Column", "items": [{ "type": "TextBlock", "text": display(record.get(*field)) }] },
                ],
            })
        })
        .collect();

    json!({
        "type": "AdaptiveCard",
        "version": "1.3",
        "title": kind.title(),
        "body": body,
    })
}

/// Display form of a collected value; missing fields render empty
fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "Yes".to_string(),
        Some(Value::Bool(false)) => "No".to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> CollectedRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_render_populates_fields_in_fixed_order() {
        let record = record(&[
            ("budget", json!(1500)),
            ("company", json!("Acme")),
            ("colour", json!("silver")),
            ("purpose", json!("gaming")),
        ]);

        let card = render(SummaryKind::Laptop, &record);
        let rows: Vec<String> = card["body"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["columns"][1]["items"][0]["text"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(rows, vec!["Acme", "silver", "gaming", "1500"]);
    }

    #[test]
    fn test_render_shares_no_state_between_calls() {
        let first = render(SummaryKind::Trip, &record(&[("country", json!("Japan"))]));
        let second = render(SummaryKind::Trip, &record(&[("country", json!("Chile"))]));

        assert_eq!(first["body"][0]["columns"][1]["items"][0]["text"], "Japan");
        assert_eq!(second["body"][0]["columns"][1]["items"][0]["text"], "Chile");
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        assert!(matches!(
            "laptop".parse::<SummaryKind>(),
            Err(DialogError::UnknownSummaryKind(_))
        ));
    }
}
