use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::NaiveDate;

use crate::codes::{merge, CodeRecord, ScrapedCode};
use crate::error::FetchError;
use crate::games::Game;
use crate::global::Global;
use crate::store::{assign_ids, StaleEntry, Store};

pub mod fetch;
pub mod sources;

#[cfg(test)]
mod tests;

pub use sources::SourceKind;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub sources: Vec<SourceKind>,
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    /// Records produced by all sources before merging.
    pub scraped: usize,
    pub failed: Vec<SourceKind>,
    pub added: Vec<CodeRecord>,
    /// Rendered entries when the run didn't write the store.
    pub preview: Option<String>,
}

impl RunSummary {
    /// (game, new codes, likely active) for every game that got new codes.
    pub fn by_game(&self, today: NaiveDate) -> Vec<(Game, usize, usize)> {
        let mut games: BTreeMap<&'static str, (Game, usize, usize)> = BTreeMap::new();

        for record in &self.added {
            let entry = games
                .entry(record.game.as_str())
                .or_insert((record.game, 0, 0));
            entry.1 += 1;
            if record.is_likely_active(today) {
                entry.2 += 1;
            }
        }

        games.into_values().collect()
    }
}

/// The records to add: one per code, none the store already has, each with
/// a fresh id.
pub fn plan(store: &Store, batch: Vec<ScrapedCode>) -> Vec<CodeRecord> {
    let mut to_add = merge(batch, &store.known_codes());
    assign_ids(&mut to_add, &store.existing_ids());
    to_add.into_iter().map(|s| s.record).collect()
}

/// Fetch every selected source at once, then merge and write in one go.
///
/// A source that fails contributes nothing and the run carries on. A missing
/// credential or a store without its insertion marker stops the run before
/// anything is fetched or written.
#[tracing::instrument(name = "Scraper", skip_all)]
pub async fn run(global: &Arc<Global>, options: &RunOptions, today: NaiveDate) -> anyhow::Result<RunSummary> {
    let config = &global.config;

    if options.sources.contains(&SourceKind::Twitter) && config.sources.twitter.bearer_token().is_none() {
        return Err(FetchError::MissingCredential(
            config.sources.twitter.bearer_token_env.clone(),
        ))
        .context("twitter source needs a bearer token");
    }

    let store = Store::load(&config.store.path, &config.store.marker).context("loading store")?;

    tracing::info!(
        path = %store.path().display(),
        known = store.known_codes().len(),
        "store loaded"
    );

    let results = futures_util::future::join_all(
        options
            .sources
            .iter()
            .map(|kind| sources::scrape(global, *kind, today)),
    )
    .await;

    let mut summary = RunSummary::default();
    let mut batch = Vec::new();

    for (kind, result) in options.sources.iter().zip(results) {
        match result {
            Ok(mut codes) => {
                tracing::info!(source = %kind, count = codes.len(), "source done");
                batch.append(&mut codes);
            }
            Err(e) => {
                tracing::error!(source = %kind, error = %e, "source skipped");
                summary.failed.push(*kind);
            }
        }
    }

    summary.scraped = batch.len();

    let records = plan(&store, batch);
    if records.is_empty() {
        tracing::info!(scraped = summary.scraped, "no new codes found, store is up to date");
        return Ok(summary);
    }

    let content = store.render_with(&records, today).context("rendering store")?;

    if options.dry_run {
        summary.preview = Some(store.preview(&records, today).context("rendering preview")?);
    } else {
        store.write(&content).context("writing store")?;
        tracing::info!(added = records.len(), "store updated");
    }

    summary.added = records;
    Ok(summary)
}

/// Mark entries whose expiration date has passed as expired.
#[tracing::instrument(name = "Expire", skip_all)]
pub fn expire(global: &Global, today: NaiveDate, dry_run: bool) -> anyhow::Result<Vec<StaleEntry>> {
    let config = &global.config;
    let store = Store::load(&config.store.path, &config.store.marker).context("loading store")?;

    let stale = store.stale_entries(today);
    if stale.is_empty() {
        tracing::info!("no stale entries");
        return Ok(stale);
    }

    if !dry_run {
        let (content, changed) = store.render_expired(today).context("rendering store")?;
        store.write(&content).context("writing store")?;
        tracing::info!(changed, "marked entries as expired");
    }

    Ok(stale)
}
