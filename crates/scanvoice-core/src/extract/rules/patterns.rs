//! Regex patterns for English-language invoices.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Invoice number, tried in order; the first pattern with a match wins
    pub static ref INVOICE_NUMBER_LABELED: Regex = Regex::new(
        r"(?i)(?:invoice|bill|receipt)[^\n]*?(?:no\.?|number|#)[\s:]*([A-Z0-9-]+)"
    ).unwrap();

    pub static ref INVOICE_NUMBER_DIGITS: Regex = Regex::new(
        r"(?i)(?:invoice|bill|receipt)[^\n]*(\d{4,})"
    ).unwrap();

    pub static ref INVOICE_NUMBER_HASH: Regex = Regex::new(
        r"(?i)(?:^|\s)(?:#|INV-?)(\d+)(?:\s|$)"
    ).unwrap();

    // Keyword-anchored dates on the same line; a D/M/Y token never starts inside a number
    pub static ref DATE_DMY: Regex = Regex::new(
        r"(?i)(?:invoice date|date|issued|due)(?:[^\n]*?[^\n\d])?(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"(?i)(?:invoice date|date|issued|due)[^\n]*?(\d{4}[-/]\d{1,2}[-/]\d{1,2})"
    ).unwrap();

    // Totals, tried in order
    pub static ref AMOUNT_CURRENCY_SYMBOL: Regex = Regex::new(
        r"(?i)(?:total|amount|balance).*?[$€£¥₹]\s*(\d+[\d,]*\.?\d*)"
    ).unwrap();

    pub static ref AMOUNT_CURRENCY_CODE: Regex = Regex::new(
        r"(?i)(?:total|amount|balance).*?(\d+[\d,]*\.?\d+)\s*(?:USD|EUR|GBP|INR|JPY|CAD|AUD|NZD)"
    ).unwrap();

    /// Characters kept when coercing free-form amount text.
    pub static ref NON_NUMERIC: Regex = Regex::new(r"[^\d.]").unwrap();
}

/// Invoice number patterns in priority order.
pub fn invoice_number_patterns() -> [&'static Regex; 3] {
    [&*INVOICE_NUMBER_LABELED, &*INVOICE_NUMBER_DIGITS, &*INVOICE_NUMBER_HASH]
}

/// Amount patterns in priority order.
pub fn amount_patterns() -> [&'static Regex; 2] {
    [&*AMOUNT_CURRENCY_SYMBOL, &*AMOUNT_CURRENCY_CODE]
}
