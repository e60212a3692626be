//! Conversion of candidate fields into a validated invoice record.
//!
//! Each field is converted independently; a value that fails to parse
//! becomes `None` and never affects the other fields.

use chrono::NaiveDate;

use super::fields::{CandidateFields, RawAmount};
use super::rules::{parse_amount, parse_date};
use crate::models::invoice::InvoiceData;

/// Parse a date in any accepted format, or `None`.
pub fn normalize_date(value: Option<&str>) -> Option<NaiveDate> {
    parse_date(value?.trim())
}

/// Coerce an amount to a finite, non-negative number, or `None`.
pub fn normalize_amount(value: Option<&RawAmount>) -> Option<f64> {
    let amount = match value? {
        RawAmount::Number(n) => *n,
        RawAmount::Text(s) => parse_amount(s)?,
    };
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

impl From<CandidateFields> for InvoiceData {
    fn from(fields: CandidateFields) -> Self {
        InvoiceData {
            invoice_date: normalize_date(fields.invoice_date.as_deref()),
            amount: normalize_amount(fields.amount.as_ref()),
            due_date: normalize_date(fields.due_date.as_deref()),
            invoice_number: fields.invoice_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_date_formats_are_idempotent() {
        for input in [
            "2024-01-31",
            "31/01/2024",
            "01/31/2024",
            "2024/01/31",
            "31-01-2024",
            "01-31-2024",
        ] {
            let once = normalize_date(Some(input)).unwrap();
            assert_eq!(once, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), "{input}");

            let iso = once.format("%Y-%m-%d").to_string();
            assert_eq!(normalize_date(Some(&iso)), Some(once));
        }
    }

    #[test]
    fn test_normalize_date_trims_and_rejects() {
        assert_eq!(
            normalize_date(Some("  2024-02-29\n")),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(normalize_date(Some("2023-02-29")), None);
        assert_eq!(normalize_date(Some("January 5, 2024")), None);
        assert_eq!(normalize_date(Some("")), None);
        assert_eq!(normalize_date(None), None);
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount(Some(&RawAmount::Number(12.5))), Some(12.5));
        assert_eq!(
            normalize_amount(Some(&RawAmount::Text("USD 1,250.00".to_string()))),
            Some(1250.0)
        );
        assert_eq!(normalize_amount(Some(&RawAmount::Text("free".to_string()))), None);
        assert_eq!(normalize_amount(Some(&RawAmount::Number(-3.0))), None);
        assert_eq!(normalize_amount(Some(&RawAmount::Number(f64::INFINITY))), None);
        assert_eq!(normalize_amount(None), None);
    }

    #[test]
    fn test_fields_into_invoice() {
        let fields = CandidateFields {
            invoice_number: Some(" INV-1 ".to_string()),
            invoice_date: Some("15/01/2023".to_string()),
            amount: Some(RawAmount::Text("$99.00".to_string())),
            due_date: Some("someday".to_string()),
        };

        let invoice = InvoiceData::from(fields);

        assert_eq!(
            invoice,
            InvoiceData {
                invoice_number: Some(" INV-1 ".to_string()),
                invoice_date: NaiveDate::from_ymd_opt(2023, 1, 15),
                amount: Some(99.0),
                due_date: None,
            }
        );
    }
}
