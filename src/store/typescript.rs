use std::collections::HashSet;
use std::ops::Range;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::StaleEntry;
use crate::codes::{extract_codes, CodeRecord};

static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bid:\s*['"]([^'"]+)['"]"#).expect("invalid id regex"));

/// One object literal without nested braces, which is all the data file
/// holds inside the array.
static ENTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{}]*\}").expect("invalid entry regex"));
static CODE_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bcode:\s*['"]([A-Za-z0-9-]+)['"]"#).expect("invalid code regex"));
static STATUS_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bstatus:\s*['"](\w+)['"]"#).expect("invalid status regex"));
static EXPIRES_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bexpiresAt:\s*['"](\d{4}-\d{2}-\d{2})['"]"#).expect("invalid expiresAt regex")
});

/// Byte offset right after the marker.
pub fn insertion_point(content: &str, marker: &str) -> Option<usize> {
    content.find(marker).map(|pos| pos + marker.len())
}

pub fn known_codes(content: &str) -> HashSet<String> {
    extract_codes(content).collect()
}

pub fn existing_ids(content: &str) -> HashSet<String> {
    ID_RE
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

pub fn insert(content: &str, insert_at: usize, records: &[CodeRecord], today: NaiveDate) -> String {
    let mut entries = String::new();
    for record in records {
        entries.push_str(&render_entry(record, today));
    }

    let mut out = String::with_capacity(content.len() + entries.len());
    out.push_str(&content[..insert_at]);
    out.push_str(&entries);
    out.push_str(&content[insert_at..]);
    out
}

/// One entry in the layout of the hand-written ones, preceded by a newline
/// and a provenance comment.
pub fn render_entry(record: &CodeRecord, today: NaiveDate) -> String {
    let mut fields = Vec::with_capacity(12);

    if let Some(id) = &record.id {
        fields.push(format!("id: '{}'", escape(id)));
    }
    fields.push(format!("code: '{}'", record.code));
    fields.push(format!("game: '{}'", record.game.as_str()));
    fields.push(format!("status: '{}'", record.status.as_str()));
    fields.push(format!("reward: '{}'", escape(&record.reward)));
    fields.push(format!("rewardType: '{}'", record.reward_type.as_str()));
    if let Some(keys) = record.keys {
        fields.push(format!("keys: {keys}"));
    }
    fields.push(format!("source: '{}'", escape(&record.source)));
    fields.push(format!("addedAt: '{}'", record.added_at));
    if let Some(verified) = record.last_verified_at {
        fields.push(format!("lastVerifiedAt: '{verified}'"));
    }
    fields.push(match record.expires_at {
        Some(date) => format!("expiresAt: '{date}'"),
        None => "expiresAt: null".to_string(),
    });
    fields.push(format!("isUniversal: {}", record.is_universal));

    let body: String = fields.iter().map(|field| format!("    {field},\n")).collect();

    format!(
        "\n  // Auto-added from {} on {}\n  {{\n{body}  }},",
        single_line(&record.source),
        today
    )
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

fn escape(s: &str) -> String {
    single_line(s).replace('\\', "\\\\").replace('\'', "\\'")
}

/// Entries after `from` whose expiration date has passed but whose status
/// says otherwise, with the byte range of the status value.
pub fn stale_entries(content: &str, from: usize, today: NaiveDate) -> Vec<(StaleEntry, Range<usize>)> {
    let mut stale = Vec::new();

    for entry in ENTRY_RE.find_iter(&content[from..]) {
        let body = entry.as_str();
        let offset = from + entry.start();

        let Some(status) = STATUS_FIELD_RE.captures(body) else {
            continue;
        };
        let Some(expires) = EXPIRES_FIELD_RE.captures(body) else {
            continue;
        };
        let Ok(expires_at) = NaiveDate::parse_from_str(&expires[1], "%Y-%m-%d") else {
            continue;
        };

        let status_value = &status[1];
        if expires_at >= today || status_value == "expired" {
            continue;
        }

        let code = CODE_FIELD_RE
            .captures(body)
            .map(|caps| caps[1].to_ascii_uppercase())
            .unwrap_or_default();

        let Some(range) = status.get(1).map(|m| offset + m.start()..offset + m.end()) else {
            continue;
        };

        stale.push((
            StaleEntry {
                code,
                status: status_value.to_string(),
                expires_at,
            },
            range,
        ));
    }

    stale
}

pub fn expire(content: &str, from: usize, today: NaiveDate) -> (String, usize) {
    let stale = stale_entries(content, from, today);
    let mut out = content.to_string();

    // back to front so earlier ranges stay valid
    for (_, range) in stale.iter().rev() {
        out.replace_range(range.clone(), "expired");
    }

    (out, stale.len())
}
