//! Date extraction and strict parsing.

use chrono::NaiveDate;

use super::patterns::{DATE_DMY, DATE_YMD};
use super::{ExtractionMatch, FieldExtractor};

/// Accepted date layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `2024-01-31`
    YearMonthDayDash,
    /// `31/01/2024`
    DayMonthYearSlash,
    /// `01/31/2024`
    MonthDayYearSlash,
    /// `2024/01/31`
    YearMonthDaySlash,
    /// `31-01-2024`
    DayMonthYearDash,
    /// `01-31-2024`
    MonthDayYearDash,
}

/// Formats in the order they are tried; the first that parses wins.
pub const DATE_FORMATS: [DateFormat; 6] = [
    DateFormat::YearMonthDayDash,
    DateFormat::DayMonthYearSlash,
    DateFormat::MonthDayYearSlash,
    DateFormat::YearMonthDaySlash,
    DateFormat::DayMonthYearDash,
    DateFormat::MonthDayYearDash,
];

#[derive(Clone, Copy)]
enum Part {
    Year,
    Month,
    Day,
}

impl DateFormat {
    fn layout(self) -> (char, [Part; 3]) {
        use Part::*;
        match self {
            DateFormat::YearMonthDayDash => ('-', [Year, Month, Day]),
            DateFormat::DayMonthYearSlash => ('/', [Day, Month, Year]),
            DateFormat::MonthDayYearSlash => ('/', [Month, Day, Year]),
            DateFormat::YearMonthDaySlash => ('/', [Year, Month, Day]),
            DateFormat::DayMonthYearDash => ('-', [Day, Month, Year]),
            DateFormat::MonthDayYearDash => ('-', [Month, Day, Year]),
        }
    }

    /// Parse `text` in this format.
    ///
    /// The year must be exactly four digits, day and month one or two, and
    /// the result a real calendar date.
    pub fn parse(self, text: &str) -> Option<NaiveDate> {
        let (separator, order) = self.layout();
        let mut fields = text.split(separator);
        let (mut year, mut month, mut day) = (None, None, None);

        for part in order {
            let field = fields.next()?;
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            match part {
                Part::Year if field.len() == 4 => year = field.parse::<i32>().ok(),
                Part::Month if field.len() <= 2 => month = field.parse::<u32>().ok(),
                Part::Day if field.len() <= 2 => day = field.parse::<u32>().ok(),
                _ => return None,
            }
        }
        if fields.next().is_some() {
            return None;
        }

        NaiveDate::from_ymd_opt(year?, month?, day?)
    }
}

/// Parse a date in any of the accepted formats.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS.iter().find_map(|format| format.parse(text))
}

/// Keyword-anchored date extractor.
#[derive(Debug, Clone, Default)]
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// Every parseable date token, in the order it appears in the text.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = [&*DATE_DMY, &*DATE_YMD]
            .into_iter()
            .flat_map(|pattern| pattern.captures_iter(text))
            .filter_map(|caps| {
                let token = caps.get(1)?;
                let date = parse_date(token.as_str())?;
                Some(ExtractionMatch::new(date, token.as_str(), token.start(), token.end()))
            })
            .collect();

        results.sort_by_key(|m| m.position.0);
        results
    }
}

/// Dates assigned to invoice roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceDates {
    /// First date in the text.
    pub invoice_date: Option<NaiveDate>,
    /// Last date in the text, when at least two distinct dates were found.
    pub due_date: Option<NaiveDate>,
}

/// Assign the first date to the invoice date and the last to the due date.
pub fn extract_dates(text: &str) -> InvoiceDates {
    let dates: Vec<NaiveDate> = DateExtractor::new()
        .extract_all(text)
        .into_iter()
        .map(|m| m.value)
        .collect();

    let Some(first) = dates.first().copied() else {
        return InvoiceDates::default();
    };
    let due_date = dates
        .last()
        .copied()
        .filter(|_| dates.iter().any(|d| *d != first));

    InvoiceDates {
        invoice_date: Some(first),
        due_date,
    }
}
