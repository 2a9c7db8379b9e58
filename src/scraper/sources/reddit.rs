use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use crate::codes::{extract_codes, merge, Classifier, Context, ScrapedCode, SourceProfile};
use crate::config::RedditConfig;
use crate::error::{Error, Result};
use crate::global::Global;
use crate::scraper::fetch;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub link_flair_text: Option<String>,
}

impl Post {
    fn posted_on(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.created_utc as i64, 0).map(|d| d.date_naive())
    }
}

pub fn profile(config: &RedditConfig) -> SourceProfile {
    SourceProfile::reddit(format!("r/{}", config.subreddit), config.default_game)
}

fn listing_url(config: &RedditConfig, sort: &str) -> String {
    format!(
        "{}/r/{}/{}.json",
        config.base_url.trim_end_matches('/'),
        config.subreddit,
        sort
    )
}

#[tracing::instrument(skip(global))]
async fn fetch_listing(global: &Arc<Global>, sort: &str) -> Result<Vec<Post>> {
    let config = &global.config.sources.reddit;
    let url = listing_url(config, sort);

    let request = global
        .http_client
        .get(&url)
        .query(&[("limit", config.limit.to_string())]);
    let body = fetch::text(request, &url).await?;

    parse_listing(&url, &body)
}

pub fn parse_listing(url: &str, body: &str) -> Result<Vec<Post>> {
    let listing: Listing = fetch::decode(url, body)?;
    Ok(listing.data.children.into_iter().map(|c| c.data).collect())
}

/// All configured listings are fetched together. One failing listing only
/// loses its own posts; the source fails when every listing does.
#[tracing::instrument(name = "reddit", skip_all)]
pub async fn scrape(global: &Arc<Global>, today: NaiveDate) -> Result<Vec<ScrapedCode>> {
    let config = &global.config.sources.reddit;

    let results = futures_util::future::join_all(
        config.sorts.iter().map(|sort| fetch_listing(global, sort)),
    )
    .await;

    let mut posts = Vec::new();
    let mut last_error: Option<Error> = None;

    for (sort, result) in config.sorts.iter().zip(results) {
        match result {
            Ok(mut listing) => {
                tracing::debug!(sort = %sort, count = listing.len(), "fetched listing");
                posts.append(&mut listing);
            }
            Err(e) => {
                tracing::warn!(sort = %sort, error = %e, "listing fetch failed");
                last_error = Some(e);
            }
        }
    }

    if posts.is_empty() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    let codes = codes_from_posts(&posts, &profile(config), today);

    tracing::info!(posts = posts.len(), count = codes.len(), "scraped codes from reddit");

    Ok(codes)
}

/// Classify every code in `posts`, one record per code, newest post first.
/// The game comes from the title alone; everything else reads title, body
/// and flair together. A code posted more than once keeps the version from
/// the most upvoted post.
pub fn codes_from_posts(posts: &[Post], profile: &SourceProfile, today: NaiveDate) -> Vec<ScrapedCode> {
    let classifier = Classifier::new(profile, today);
    let mut seen_posts = HashSet::new();
    let mut candidates = Vec::new();

    for post in posts {
        if !seen_posts.insert(post.id.as_str()) {
            continue;
        }

        let text = format!("{} {}", post.title, post.selftext.as_deref().unwrap_or(""));
        let with_flair = match &post.link_flair_text {
            Some(flair) => format!("{text} {flair}"),
            None => text.clone(),
        };

        let mut ctx = Context::new(&with_flair).game_text(&post.title);
        if let Some(date) = post.posted_on() {
            ctx = ctx.added_at(date);
        }

        for code in extract_codes(&text) {
            tracing::trace!(code = %code, permalink = %post.permalink, "code in post");
            candidates.push(ScrapedCode {
                record: classifier.classify(&code, &ctx),
                score: Some(post.ups),
                id_prefix: profile.id_prefix,
            });
        }
    }

    let mut codes = merge(candidates, &HashSet::new());
    codes.sort_by(|a, b| b.record.added_at.cmp(&a.record.added_at));
    codes
}
