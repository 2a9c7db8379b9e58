use chrono::NaiveDate;

/// The calendar date every rule in a run compares against.
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
