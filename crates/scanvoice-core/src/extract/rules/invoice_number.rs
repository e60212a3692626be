//! Invoice number extraction.

use super::patterns::invoice_number_patterns;
use super::{ExtractionMatch, FieldExtractor};

/// Invoice number extractor.
///
/// The first capture group is taken verbatim, so `Invoice #INV-1234` yields
/// `INV-1234` while a bare `#1234` yields `1234`.
#[derive(Debug, Clone, Default)]
pub struct InvoiceNumberExtractor;

impl InvoiceNumberExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FieldExtractor for InvoiceNumberExtractor {
    type Output = ExtractionMatch<String>;

    /// First match of the highest-priority pattern that matches at all.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        invoice_number_patterns().into_iter().find_map(|pattern| {
            let group = pattern.captures(text)?.get(1)?;
            let value = group.as_str().trim();
            (!value.is_empty())
                .then(|| ExtractionMatch::new(value.to_string(), group.as_str(), group.start(), group.end()))
        })
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        invoice_number_patterns()
            .into_iter()
            .flat_map(|pattern| pattern.captures_iter(text))
            .filter_map(|caps| {
                let group = caps.get(1)?;
                Some(ExtractionMatch::new(
                    group.as_str().trim().to_string(),
                    group.as_str(),
                    group.start(),
                    group.end(),
                ))
            })
            .collect()
    }
}
