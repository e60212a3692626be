//! Canonical invoice record handed to the persistence boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Validated invoice fields.
///
/// Every populated field has passed validation: dates are real calendar
/// dates (serialized as `YYYY-MM-DD`) and the amount is finite and
/// non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    /// Invoice number/identifier, exactly as extracted.
    pub invoice_number: Option<String>,

    /// Date the invoice was issued.
    pub invoice_date: Option<NaiveDate>,

    /// Total amount.
    pub amount: Option<f64>,

    /// Payment due date.
    pub due_date: Option<NaiveDate>,
}

impl InvoiceData {
    /// Number of populated fields (0 - 4).
    pub fn filled_fields(&self) -> usize {
        [
            self.invoice_number.is_some(),
            self.invoice_date.is_some(),
            self.amount.is_some(),
            self.due_date.is_some(),
        ]
        .iter()
        .filter(|filled| **filled)
        .count()
    }

    /// Names of fields that could not be extracted.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.invoice_number.is_none() {
            missing.push("invoice_number");
        }
        if self.invoice_date.is_none() {
            missing.push("invoice_date");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.due_date.is_none() {
            missing.push("due_date");
        }
        missing
    }
}

/// Which extractor produced the candidate fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    /// The AI model returned usable data.
    Ai,
    /// The AI model returned nothing; regex rules were used.
    Fallback,
}

impl std::fmt::Display for ExtractionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionPath::Ai => f.write_str("ai"),
            ExtractionPath::Fallback => f.write_str("fallback"),
        }
    }
}

/// Result of running one document through the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedInvoice {
    /// Validated invoice fields.
    pub invoice: InvoiceData,

    /// Recognized text, pages joined by a blank line.
    pub raw_text: String,

    /// Extractor that produced the fields.
    pub path: ExtractionPath,

    /// Number of pages recognized.
    pub page_count: usize,

    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dates_serialize_as_iso() {
        let invoice = InvoiceData {
            invoice_number: Some("INV-7".to_string()),
            invoice_date: NaiveDate::from_ymd_opt(2024, 3, 9),
            amount: Some(12.5),
            due_date: None,
        };

        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "invoice_number": "INV-7",
                "invoice_date": "2024-03-09",
                "amount": 12.5,
                "due_date": null
            })
        );
    }

    #[test]
    fn test_missing_fields() {
        let invoice = InvoiceData {
            amount: Some(1.0),
            ..InvoiceData::default()
        };
        assert_eq!(invoice.filled_fields(), 1);
        assert_eq!(
            invoice.missing_fields(),
            vec!["invoice_number", "invoice_date", "due_date"]
        );
    }
}
