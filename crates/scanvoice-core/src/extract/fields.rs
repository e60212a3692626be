//! Unvalidated field values produced by the extractors.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Candidate invoice fields, before validation.
///
/// Both extraction paths produce this shape. Keys the extractors do not know
/// about are ignored when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFields {
    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_number: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_date: Option<String>,

    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<RawAmount>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub due_date: Option<String>,
}

/// An amount as returned by an extractor: already numeric or still text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn is_blank(&self) -> bool {
        match self {
            RawAmount::Number(n) => *n == 0.0,
            RawAmount::Text(s) => s.is_empty(),
        }
    }
}

impl CandidateFields {
    /// True when no field carries a usable value.
    ///
    /// Empty strings and a zero amount count as absent. Whitespace is a value.
    pub fn is_empty(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().is_none_or(str::is_empty);

        blank(&self.invoice_number)
            && blank(&self.invoice_date)
            && blank(&self.due_date)
            && self.amount.as_ref().is_none_or(RawAmount::is_blank)
    }
}

/// Accept a string or a number; anything else becomes `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<RawAmount>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64().map(RawAmount::Number),
        Some(Value::String(s)) => Some(RawAmount::Text(s)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_ignores_unknown_keys() {
        let fields: CandidateFields = serde_json::from_str(
            r#"{"invoice_number": "A-1", "amount": 12.5, "vendor": "ACME", "due_date": null}"#,
        )
        .unwrap();

        assert_eq!(
            fields,
            CandidateFields {
                invoice_number: Some("A-1".to_string()),
                amount: Some(RawAmount::Number(12.5)),
                ..CandidateFields::default()
            }
        );
    }

    #[test]
    fn test_deserialize_tolerates_odd_types() {
        let fields: CandidateFields = serde_json::from_str(
            r#"{"invoice_number": 1234, "invoice_date": false, "amount": "$1,250.00"}"#,
        )
        .unwrap();

        assert_eq!(fields.invoice_number.as_deref(), Some("1234"));
        assert_eq!(fields.invoice_date, None);
        assert_eq!(fields.amount, Some(RawAmount::Text("$1,250.00".to_string())));
    }

    #[test]
    fn test_is_empty_uses_truthiness() {
        assert!(CandidateFields::default().is_empty());

        let blank = CandidateFields {
            invoice_number: Some(String::new()),
            invoice_date: Some(String::new()),
            amount: Some(RawAmount::Number(0.0)),
            due_date: None,
        };
        assert!(blank.is_empty());

        let with_amount = CandidateFields {
            amount: Some(RawAmount::Text("0".to_string())),
            ..CandidateFields::default()
        };
        assert!(!with_amount.is_empty());

        let with_date = CandidateFields {
            due_date: Some("2024-01-01".to_string()),
            ..CandidateFields::default()
        };
        assert!(!with_date.is_empty());

        let whitespace = CandidateFields {
            invoice_number: Some("  ".to_string()),
            ..CandidateFields::default()
        };
        assert!(!whitespace.is_empty());
    }
}
