use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::codes::extract::contains_code;
use crate::codes::{extract_codes, Classifier, Context, ScrapedCode, SourceProfile};
use crate::config::{TwitterAccount, TwitterConfig};
use crate::error::{FetchError, Result};
use crate::global::Global;
use crate::scraper::fetch;

const SHIFT_KEYWORDS: [&str; 5] = ["shift code", "golden key", "skeleton key", "diamond key", "redeem"];

#[derive(Debug, Deserialize)]
struct UserLookup {
    data: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    #[serde(default)]
    data: Vec<Tweet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

pub fn profile(config: &TwitterConfig, account: &TwitterAccount) -> SourceProfile {
    SourceProfile::twitter(format!("Twitter {}", account.display_name), config.default_game)
}

fn bearer_token(config: &TwitterConfig) -> Result<String> {
    config
        .bearer_token()
        .ok_or_else(|| FetchError::MissingCredential(config.bearer_token_env.clone()).into())
}

#[tracing::instrument(skip(global, token))]
async fn user_id(global: &Arc<Global>, token: &str, username: &str) -> Result<Option<String>> {
    let config = &global.config.sources.twitter;
    let url = format!("{}/users/by/username/{}", config.api_base.trim_end_matches('/'), username);

    let request = global.http_client.get(&url).bearer_auth(token);
    let body = fetch::text(request, &url).await?;
    let lookup: UserLookup = fetch::decode(&url, &body)?;

    Ok(lookup.data.map(|u| u.id))
}

#[tracing::instrument(skip(global, token))]
async fn recent_tweets(global: &Arc<Global>, token: &str, user_id: &str) -> Result<Vec<Tweet>> {
    let config = &global.config.sources.twitter;
    let url = format!("{}/users/{}/tweets", config.api_base.trim_end_matches('/'), user_id);
    let start_time = Utc::now() - chrono::Duration::days(config.lookback_days);

    let request = global
        .http_client
        .get(&url)
        .bearer_auth(token)
        .query(&[
            ("max_results", config.max_results.to_string()),
            ("start_time", start_time.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            ("tweet.fields", "created_at,text".to_string()),
        ]);
    let body = fetch::text(request, &url).await?;

    parse_timeline(&url, &body)
}

pub fn parse_timeline(url: &str, body: &str) -> Result<Vec<Tweet>> {
    let timeline: Timeline = fetch::decode(url, body)?;
    Ok(timeline.data)
}

async fn scrape_account(
    global: &Arc<Global>,
    token: &str,
    account: &TwitterAccount,
    today: NaiveDate,
) -> Result<Vec<ScrapedCode>> {
    let Some(id) = user_id(global, token, &account.username).await? else {
        tracing::warn!(username = %account.username, "account not found");
        return Ok(Vec::new());
    };

    let tweets = recent_tweets(global, token, &id).await?;
    let codes = codes_from_tweets(&tweets, &profile(&global.config.sources.twitter, account), today);

    tracing::info!(
        username = %account.username,
        tweets = tweets.len(),
        count = codes.len(),
        "scraped account"
    );

    Ok(codes)
}

/// Accounts are walked one at a time with a pause in between. An account
/// that fails is skipped.
#[tracing::instrument(name = "twitter", skip_all)]
pub async fn scrape(global: &Arc<Global>, today: NaiveDate) -> Result<Vec<ScrapedCode>> {
    let config = &global.config.sources.twitter;
    let token = bearer_token(config)?;

    let mut codes = Vec::new();

    for (i, account) in config.accounts.iter().enumerate() {
        if i > 0 && config.account_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.account_delay_ms)).await;
        }

        match scrape_account(global, &token, account, today).await {
            Ok(mut found) => codes.append(&mut found),
            Err(e) => tracing::warn!(username = %account.username, error = %e, "account skipped"),
        }
    }

    tracing::info!(count = codes.len(), "scraped codes from twitter");

    Ok(codes)
}

pub fn is_shift_tweet(text: &str) -> bool {
    let lower = text.to_lowercase();
    SHIFT_KEYWORDS.iter().any(|kw| lower.contains(kw)) || contains_code(text)
}

pub fn codes_from_tweets(tweets: &[Tweet], profile: &SourceProfile, today: NaiveDate) -> Vec<ScrapedCode> {
    let classifier = Classifier::new(profile, today);
    let mut codes = Vec::new();

    for tweet in tweets.iter().filter(|t| is_shift_tweet(&t.text)) {
        let mut ctx = Context::new(&tweet.text);
        if let Some(created) = tweet.created_at {
            ctx = ctx.added_at(created.date_naive());
        }

        for code in extract_codes(&tweet.text) {
            tracing::trace!(code = %code, tweet = %tweet.id, "code in tweet");
            codes.push(ScrapedCode {
                record: classifier.classify(&code, &ctx),
                score: None,
                id_prefix: profile.id_prefix,
            });
        }
    }

    codes
}
