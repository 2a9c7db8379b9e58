use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::codes::{CodeRecord, ScrapedCode};
use crate::error::{Error, Result, StructuralError};

mod json;
mod typescript;


/// Where new entries go in the TypeScript data file.
pub const DEFAULT_MARKER: &str = "export const mockShiftCodes: ShiftCode[] = [";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    /// A source file holding a literal array; entries are inserted as text.
    TypeScript,
    /// A file holding a single JSON array.
    Json,
}

impl StoreFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::TypeScript,
        }
    }
}

#[derive(Debug)]
enum Document {
    Text { content: String, insert_at: usize },
    Json(Vec<serde_json::Value>),
}

/// An entry whose status disagrees with its expiration date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleEntry {
    pub code: String,
    pub status: String,
    pub expires_at: NaiveDate,
}

/// The persisted list of codes, read once per run.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    document: Document,
}

impl Store {
    /// Read and check the store. A TypeScript store without the marker, or a
    /// JSON store that isn't an array, is rejected here before any source is
    /// fetched.
    #[tracing::instrument(skip(marker))]
    pub fn load(path: &Path, marker: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|inner| Error::Io {
            path: path.to_path_buf(),
            inner,
        })?;

        let document = match StoreFormat::from_path(path) {
            StoreFormat::TypeScript => {
                let insert_at = typescript::insertion_point(&content, marker).ok_or_else(|| {
                    StructuralError::MissingMarker {
                        path: path.to_path_buf(),
                        marker: marker.to_string(),
                    }
                })?;
                Document::Text { content, insert_at }
            }
            StoreFormat::Json => Document::Json(json::parse(path, &content)?),
        };

        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> StoreFormat {
        match self.document {
            Document::Text { .. } => StoreFormat::TypeScript,
            Document::Json(_) => StoreFormat::Json,
        }
    }

    /// Upper-cased code values already present.
    pub fn known_codes(&self) -> HashSet<String> {
        match &self.document {
            Document::Text { content, .. } => typescript::known_codes(content),
            Document::Json(entries) => json::known_codes(entries),
        }
    }

    pub fn existing_ids(&self) -> HashSet<String> {
        match &self.document {
            Document::Text { content, .. } => typescript::existing_ids(content),
            Document::Json(entries) => json::existing_ids(entries),
        }
    }

    /// The full new content with `records` placed ahead of every existing
    /// entry. Nothing outside the insertion changes.
    pub fn render_with(&self, records: &[CodeRecord], today: NaiveDate) -> Result<String> {
        match &self.document {
            Document::Text { content, insert_at } => {
                Ok(typescript::insert(content, *insert_at, records, today))
            }
            Document::Json(entries) => json::render_with(&self.path, entries, records),
        }
    }

    /// Just the new entries, rendered the way they would be written.
    pub fn preview(&self, records: &[CodeRecord], today: NaiveDate) -> Result<String> {
        match &self.document {
            Document::Text { .. } => Ok(records
                .iter()
                .map(|r| typescript::render_entry(r, today))
                .collect()),
            Document::Json(_) => json::render_with(&self.path, &[], records),
        }
    }

    pub fn stale_entries(&self, today: NaiveDate) -> Vec<StaleEntry> {
        match &self.document {
            Document::Text { content, insert_at } => {
                typescript::stale_entries(content, *insert_at, today)
                    .into_iter()
                    .map(|(entry, _)| entry)
                    .collect()
            }
            Document::Json(entries) => json::stale_entries(entries, today),
        }
    }

    /// The full new content with every stale entry marked expired, plus how
    /// many entries changed.
    pub fn render_expired(&self, today: NaiveDate) -> Result<(String, usize)> {
        match &self.document {
            Document::Text { content, insert_at } => {
                Ok(typescript::expire(content, *insert_at, today))
            }
            Document::Json(entries) => json::render_expired(&self.path, entries, today),
        }
    }

    /// Replace the store with `content`. The content lands in a sibling file
    /// first and is renamed over the store, so readers never see half of it.
    /// The sibling is removed again when the rename fails.
    #[tracing::instrument(skip(self, content), fields(path = %self.path.display()))]
    pub fn write(&self, content: &str) -> Result<()> {
        let io_err = |inner| Error::Io {
            path: self.path.clone(),
            inner,
        };

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".into());
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));

        let written = std::fs::write(&tmp, content).and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            match std::fs::remove_file(&tmp) {
                Ok(()) => {}
                Err(cleanup) if cleanup.kind() == std::io::ErrorKind::NotFound => {}
                Err(cleanup) => {
                    tracing::warn!(tmp = %tmp.display(), error = %cleanup, "temporary file left behind")
                }
            }
            return Err(io_err(e));
        }

        tracing::debug!(bytes = content.len(), "store written");
        Ok(())
    }
}

/// Give every scraped record an id of the form
/// `<prefix>-<game>-<first ten code characters>`, adding `-1`, `-2`, ... when
/// the id is already taken in the store or earlier in the batch.
pub fn assign_ids(batch: &mut [ScrapedCode], existing: &HashSet<String>) {
    let mut taken: HashSet<String> = existing.clone();

    for scraped in batch.iter_mut() {
        let fragment: String = scraped
            .record
            .code
            .chars()
            .filter(|c| *c != '-')
            .take(10)
            .collect::<String>()
            .to_ascii_lowercase();
        let base = format!("{}-{}-{}", scraped.id_prefix, scraped.record.game.slug(), fragment);

        let mut id = base.clone();
        let mut n = 0;
        while taken.contains(&id) {
            n += 1;
            id = format!("{base}-{n}");
        }

        taken.insert(id.clone());
        scraped.record.id = Some(id);
    }
}
