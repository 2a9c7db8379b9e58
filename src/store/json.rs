use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde_json::Value;

use super::StaleEntry;
use crate::codes::CodeRecord;
use crate::error::{Result, StructuralError};

pub fn parse(path: &Path, content: &str) -> Result<Vec<Value>, StructuralError> {
    let value: Value = serde_json::from_str(content).map_err(|inner| StructuralError::Malformed {
        path: path.to_path_buf(),
        inner,
    })?;

    match value {
        Value::Array(entries) => Ok(entries),
        _ => Err(StructuralError::NotAnArray {
            path: path.to_path_buf(),
        }),
    }
}

fn str_field<'a>(entry: &'a Value, field: &str) -> Option<&'a str> {
    entry.get(field).and_then(Value::as_str)
}

pub fn known_codes(entries: &[Value]) -> HashSet<String> {
    entries
        .iter()
        .filter_map(|e| str_field(e, "code"))
        .map(|c| c.trim().to_ascii_uppercase())
        .collect()
}

pub fn existing_ids(entries: &[Value]) -> HashSet<String> {
    entries
        .iter()
        .filter_map(|e| str_field(e, "id"))
        .map(str::to_string)
        .collect()
}

fn serialize(path: &Path, entries: &[Value]) -> Result<String> {
    let mut out = serde_json::to_string_pretty(entries).map_err(|inner| StructuralError::Malformed {
        path: path.to_path_buf(),
        inner,
    })?;
    out.push('\n');
    Ok(out)
}

pub fn render_with(path: &Path, entries: &[Value], records: &[CodeRecord]) -> Result<String> {
    let mut all = Vec::with_capacity(entries.len() + records.len());
    for record in records {
        let value = serde_json::to_value(record).map_err(|inner| StructuralError::Malformed {
            path: path.to_path_buf(),
            inner,
        })?;
        all.push(value);
    }
    all.extend(entries.iter().cloned());

    serialize(path, &all)
}

fn stale(entry: &Value, today: NaiveDate) -> Option<StaleEntry> {
    let status = str_field(entry, "status")?;
    let expires_at = NaiveDate::parse_from_str(str_field(entry, "expiresAt")?, "%Y-%m-%d").ok()?;

    if expires_at >= today || status == "expired" {
        return None;
    }

    Some(StaleEntry {
        code: str_field(entry, "code").unwrap_or_default().to_ascii_uppercase(),
        status: status.to_string(),
        expires_at,
    })
}

pub fn stale_entries(entries: &[Value], today: NaiveDate) -> Vec<StaleEntry> {
    entries.iter().filter_map(|e| stale(e, today)).collect()
}

pub fn render_expired(path: &Path, entries: &[Value], today: NaiveDate) -> Result<(String, usize)> {
    let mut entries = entries.to_vec();
    let mut changed = 0;

    for entry in entries.iter_mut() {
        if stale(entry, today).is_some() {
            entry["status"] = Value::String("expired".into());
            changed += 1;
        }
    }

    Ok((serialize(path, &entries)?, changed))
}
