//! Rule-based field extractors used when the AI path returns nothing.

pub mod amounts;
pub mod dates;
pub mod invoice_number;
pub mod patterns;

pub use amounts::{parse_amount, AmountExtractor};
pub use dates::{extract_dates, parse_date, DateFormat, DateExtractor, InvoiceDates, DATE_FORMATS};
pub use invoice_number::InvoiceNumberExtractor;

use tracing::debug;

use super::fields::{CandidateFields, RawAmount};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// An extracted value and where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Byte range of the matched token in the source text.
    pub position: (usize, usize),
    /// Matched token.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            value,
            position: (start, end),
            source: source.into(),
        }
    }
}

/// Deterministic, offline extraction of all four fields.
///
/// Never fails; fields that nothing matched stay `None`.
pub trait FallbackExtractor: Send + Sync {
    fn extract(&self, text: &str) -> CandidateFields;
}

/// Combines the individual rule extractors.
#[derive(Debug, Clone, Default)]
pub struct RegexExtractor {
    invoice_number: InvoiceNumberExtractor,
    amount: AmountExtractor,
}

impl RegexExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FallbackExtractor for RegexExtractor {
    fn extract(&self, text: &str) -> CandidateFields {
        let dates = extract_dates(text);
        let fields = CandidateFields {
            invoice_number: self.invoice_number.extract(text).map(|m| m.value),
            invoice_date: dates.invoice_date.map(|d| d.format("%Y-%m-%d").to_string()),
            amount: self.amount.extract(text).map(|m| RawAmount::Number(m.value)),
            due_date: dates.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
        };

        debug!("Regex extraction: {:?}", fields);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_line_invoice() {
        let text = "Invoice #INV-1234 dated 2023-01-15, due 2023-02-15, Total: $1,250.00";

        let fields = RegexExtractor::new().extract(text);

        assert_eq!(
            fields,
            CandidateFields {
                invoice_number: Some("INV-1234".to_string()),
                invoice_date: Some("2023-01-15".to_string()),
                amount: Some(RawAmount::Number(1250.0)),
                due_date: Some("2023-02-15".to_string()),
            }
        );
    }

    #[test]
    fn test_multi_line_invoice() {
        let text = "ACME Corp\n\
                    Invoice Number: A-778\n\
                    Invoice Date: 03/14/2024\n\
                    Due Date: 04/13/2024\n\
                    Subtotal $100.00\n\
                    Tax $8.00\n\
                    Total $108.00";

        let fields = RegexExtractor::new().extract(text);

        assert_eq!(fields.invoice_number.as_deref(), Some("A-778"));
        assert_eq!(fields.invoice_date.as_deref(), Some("2024-03-14"));
        assert_eq!(fields.due_date.as_deref(), Some("2024-04-13"));
        assert_eq!(fields.amount, Some(RawAmount::Number(108.0)));
    }

    #[test]
    fn test_nothing_matches() {
        let fields = RegexExtractor::new().extract("lorem ipsum dolor sit amet");
        assert_eq!(fields, CandidateFields::default());
        assert!(fields.is_empty());
    }
}
