//! Total amount extraction.

use super::patterns::{amount_patterns, NON_NUMERIC};
use super::{ExtractionMatch, FieldExtractor};

/// Amount extractor keyed on `total`, `amount` and `balance` labels.
#[derive(Debug, Clone, Default)]
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<f64>;

    /// The largest labeled amount; subtotals and tax lines are smaller than
    /// the grand total.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text)
            .into_iter()
            .max_by(|a, b| a.value.total_cmp(&b.value))
    }

    /// All amounts matched by the first pattern that yields any.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        for pattern in amount_patterns() {
            let parsed: Option<Vec<Self::Output>> = pattern
                .captures_iter(text)
                .map(|caps| {
                    let token = caps.get(1)?;
                    let value = token.as_str().replace(',', "").parse::<f64>().ok()?;
                    Some(ExtractionMatch::new(value, token.as_str(), token.start(), token.end()))
                })
                .collect();

            match parsed {
                Some(amounts) if !amounts.is_empty() => return amounts,
                _ => continue,
            }
        }
        Vec::new()
    }
}

/// Coerce free-form amount text by dropping everything but digits and dots.
///
/// `"$1,250.00"` parses as `1250.0`; text with no digits is `None`.
pub fn parse_amount(text: &str) -> Option<f64> {
    NON_NUMERIC.replace_all(text, "").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(text: &str) -> Option<f64> {
        AmountExtractor::new().extract(text).map(|m| m.value)
    }

    #[test]
    fn test_largest_total_wins() {
        assert_eq!(amount("Subtotal $100.00 ... Total $150.00"), Some(150.0));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(amount("Total: $1,250.00"), Some(1250.0));
        assert_eq!(amount("Balance due £ 12,000"), Some(12000.0));
    }

    #[test]
    fn test_currency_code_suffix() {
        assert_eq!(amount("Amount payable 1,499.90 EUR"), Some(1499.9));
    }

    #[test]
    fn test_symbol_pattern_takes_priority() {
        assert_eq!(amount("Total 999.00 USD\nAmount paid $10.00"), Some(10.0));
    }

    #[test]
    fn test_unlabeled_amounts_ignored() {
        assert_eq!(amount("Paid $500.00 on delivery"), None);
        assert_eq!(amount("Total to be confirmed"), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,250.00"), Some(1250.0));
        assert_eq!(parse_amount("EUR 99"), Some(99.0));
        assert_eq!(parse_amount("1.2.3"), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount(""), None);
    }
}
