use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::header::ACCEPT;
use scraper::{Html, Selector};

use crate::codes::{extract_codes, Classifier, Context, ScrapedCode, SourceProfile};
use crate::config::Game8Config;
use crate::error::Result;
use crate::global::Global;
use crate::scraper::fetch;
use crate::util::collapse_whitespace;

pub fn profile(config: &Game8Config) -> SourceProfile {
    SourceProfile::game8(config.label.as_str(), config.default_game)
}

#[tracing::instrument(name = "game8", skip_all)]
pub async fn scrape(global: &Arc<Global>, today: NaiveDate) -> Result<Vec<ScrapedCode>> {
    let config = &global.config.sources.game8;

    tracing::info!(url = %config.url, "fetching codes page");

    let request = global.http_client.get(&config.url).header(
        ACCEPT,
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    );
    let html = fetch::text(request, &config.url).await?;

    let codes = parse_html(&html, &profile(config), today);

    tracing::info!(count = codes.len(), "scraped codes from game8");

    Ok(codes)
}

/// Codes table rows are `code | reward | availability`. Codes that show up
/// anywhere else on the page are kept too, without reward or status.
pub fn parse_html(html: &str, profile: &SourceProfile, today: NaiveDate) -> Vec<ScrapedCode> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr").expect("invalid row selector");
    let cell_selector = Selector::parse("td").expect("invalid cell selector");

    let classifier = Classifier::new(profile, today);
    let mut seen = HashSet::new();
    let mut codes = Vec::new();

    for row in document.select(&row_selector) {
        let row_html = row.html();
        let row_codes: Vec<String> = extract_codes(&row_html).collect();
        if row_codes.is_empty() {
            continue;
        }

        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|td| collapse_whitespace(&td.text().collect::<String>()))
            .collect();

        if cells.len() < 2 {
            continue;
        }

        let reward = cells[1].as_str();
        let availability = cells.get(2).map(String::as_str).unwrap_or("");
        let row_text = cells.join(" ");

        let ctx = Context::new(reward)
            .game_text(&row_text)
            .expiry_cell(availability)
            .reward(if reward.is_empty() { "SHiFT Reward" } else { reward });

        for code in row_codes {
            if !seen.insert(code.clone()) {
                continue;
            }

            codes.push(ScrapedCode {
                record: classifier.classify(&code, &ctx),
                score: None,
                id_prefix: profile.id_prefix,
            });
        }
    }

    let table_count = codes.len();

    for code in extract_codes(html) {
        if !seen.insert(code.clone()) {
            continue;
        }

        let ctx = Context::default()
            .reward(format!("SHiFT Reward (from {})", profile.label))
            .unverified();

        codes.push(ScrapedCode {
            record: classifier.classify(&code, &ctx),
            score: None,
            id_prefix: profile.id_prefix,
        });
    }

    if codes.len() > table_count {
        tracing::debug!(
            extra = codes.len() - table_count,
            "found codes outside the codes table"
        );
    }

    codes
}
