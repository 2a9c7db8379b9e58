use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::ParseError;

/// How the captures of one pattern map to a date.
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// month / day / optional year
    Numeric,
    /// month name, day, optional year
    MonthName,
}

/// Which date forms count as an expiration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateSyntax {
    /// Only dates introduced by "exp..." or "until". Posts and tweets mention
    /// other dates too.
    #[default]
    Prefixed,
    /// Any date. For text that holds nothing but availability, like a table
    /// cell.
    Bare,
}

struct DatePattern {
    re: Regex,
    shape: Shape,
    syntax: DateSyntax,
}

impl DatePattern {
    fn new(re: &str, shape: Shape, syntax: DateSyntax) -> Self {
        Self {
            re: Regex::new(re).expect("invalid date regex"),
            shape,
            syntax,
        }
    }

    fn applies_to(&self, syntax: DateSyntax) -> bool {
        self.syntax == DateSyntax::Prefixed || syntax == DateSyntax::Bare
    }
}

/// Tried in order; the first pattern occurrence that forms a real date wins.
static PATTERNS: Lazy<Vec<DatePattern>> = Lazy::new(|| {
    vec![
        // "Exp: 12/31/2025", "Expires 1/13", "Expiration 3/4/25"
        DatePattern::new(
            r"(?i)\bexp(?:ires?|iration|\.)?[:\s.]+(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b",
            Shape::Numeric,
            DateSyntax::Prefixed,
        ),
        // "Code Exp: Dec. 31, 2030", "expires March 3rd"
        DatePattern::new(
            r"(?i)\bexp(?:ires?|iration|\.)?[:\s.]+(?:on\s+)?([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s+(\d{4}))?\b",
            Shape::MonthName,
            DateSyntax::Prefixed,
        ),
        // "until 1/13"
        DatePattern::new(
            r"(?i)\buntil\s+(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b",
            Shape::Numeric,
            DateSyntax::Prefixed,
        ),
        // "December 31, 2030"
        DatePattern::new(
            r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b",
            Shape::MonthName,
            DateSyntax::Bare,
        ),
        // "12/31/2030"
        DatePattern::new(
            r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b",
            Shape::Numeric,
            DateSyntax::Bare,
        ),
    ]
});

static NO_EXPIRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:indefinite(?:ly)?|no\s+expiration|never\s+expires?|permanent)\b")
        .expect("invalid no-expiry regex")
});

/// Parse the first expiration date mentioned in `text`.
///
/// A missing year means the next occurrence of that day, counting today. So
/// does a year before 2000: two digit years are read as 19xx from 50 up and
/// 20xx below. Text that says the code never expires yields `None`. With
/// [`DateSyntax::Prefixed`] a date only counts after "exp..." or "until".
pub fn parse_expiration(text: &str, today: NaiveDate, syntax: DateSyntax) -> Option<NaiveDate> {
    if text.trim().is_empty() || NO_EXPIRY_RE.is_match(text) {
        return None;
    }

    for pattern in PATTERNS.iter().filter(|p| p.applies_to(syntax)) {
        for caps in pattern.re.captures_iter(text) {
            match date_from_captures(&caps, pattern.shape, today) {
                Ok(date) => return Some(date),
                Err(e) => tracing::trace!(error = %e, "skipping date candidate"),
            }
        }
    }

    None
}

fn date_from_captures(caps: &Captures, shape: Shape, today: NaiveDate) -> Result<NaiveDate, ParseError> {
    let invalid = || ParseError::Date(caps[0].to_string());

    let month = match shape {
        Shape::Numeric => caps[1].parse::<u32>().map_err(|_| invalid())?,
        Shape::MonthName => month_from_name(&caps[1]).ok_or_else(invalid)?,
    };
    let day = caps[2].parse::<u32>().map_err(|_| invalid())?;

    let year = match caps.get(3) {
        Some(year) => Some(normalize_year(year.as_str()).ok_or_else(invalid)?),
        None => None,
    };

    match year {
        Some(year) if year >= 2000 => NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid),
        _ => next_occurrence(month, day, today).ok_or_else(invalid),
    }
}

/// The first `month`/`day` on or after `today`. Eight years always reach a
/// leap year, so Feb 29 resolves too.
fn next_occurrence(month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    (today.year()..=today.year() + 8)
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .find(|date| *date >= today)
}

fn normalize_year(year: &str) -> Option<i32> {
    let value = year.parse::<i32>().ok()?;
    match year.len() {
        2 if value >= 50 => Some(1900 + value),
        2 => Some(2000 + value),
        4 => Some(value),
        _ => None,
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];

    let name = name.to_ascii_lowercase();
    if name.len() < 3 {
        return None;
    }

    // "sept" is the only common abbreviation longer than three letters
    let name = if name == "sept" { "sep".to_string() } else { name };

    MONTHS
        .iter()
        .position(|full| full.starts_with(name.as_str()))
        .map(|i| i as u32 + 1)
}
