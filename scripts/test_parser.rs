//! Run one source's parser and print every record it classifies.
//!
//! Without a fixture the live source is fetched; with one, the saved page or
//! API response is parsed instead. The store is never touched.
//!
//! Run with: cargo run --bin test-parser -- <source> [fixture-file]
//! Examples:
//!   cargo run --bin test-parser -- game8
//!   cargo run --bin test-parser -- reddit saved/hot.json
//!   cargo run --bin test-parser -- twitter saved/timeline.json

use anyhow::Context as _;
use clap::ValueEnum;

use shift_codes::codes::ScrapedCode;
use shift_codes::config::{Settings, TwitterAccount};
use shift_codes::global::Global;
use shift_codes::scraper::sources::{self, game8, reddit, twitter, SourceKind};
use shift_codes::util;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <source> [fixture-file]", args[0]);
        eprintln!("Sources: game8, reddit, twitter");
        std::process::exit(1);
    }

    let Ok(kind) = SourceKind::from_str(&args[1], true) else {
        eprintln!("Unknown source: {}", args[1]);
        std::process::exit(1);
    };

    let config = Settings::new()?;
    let today = util::today();

    let codes: Vec<ScrapedCode> = match args.get(2) {
        Some(path) => {
            let body = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            println!("Parsing {kind} fixture {path} ({} chars)...\n", body.len());

            match kind {
                SourceKind::Game8 => {
                    game8::parse_html(&body, &game8::profile(&config.sources.game8), today)
                }
                SourceKind::Reddit => {
                    let posts = reddit::parse_listing(path, &body)?;
                    println!("{} posts", posts.len());
                    reddit::codes_from_posts(&posts, &reddit::profile(&config.sources.reddit), today)
                }
                SourceKind::Twitter => {
                    let tweets = twitter::parse_timeline(path, &body)?;
                    println!("{} tweets", tweets.len());
                    let account = config
                        .sources
                        .twitter
                        .accounts
                        .first()
                        .cloned()
                        .unwrap_or_else(|| TwitterAccount {
                            username: "fixture".into(),
                            display_name: "fixture".into(),
                        });
                    let profile = twitter::profile(&config.sources.twitter, &account);
                    twitter::codes_from_tweets(&tweets, &profile, today)
                }
            }
        }
        None => {
            println!("Fetching {kind}...\n");
            let global = Global::init(config)?;
            sources::scrape(&global, kind, today).await?
        }
    };

    if codes.is_empty() {
        println!("\nNo codes found!");
        return Ok(());
    }

    println!("\nFound {} codes:\n", codes.len());
    for (i, scraped) in codes.iter().enumerate() {
        let r = &scraped.record;
        println!("  {}. {} [{}]", i + 1, r.code, r.game);
        println!("     reward:  {} ({})", r.reward, r.reward_type.as_str());
        if let Some(keys) = r.keys {
            println!("     keys:    {keys}");
        }
        println!("     status:  {}", r.status.as_str());
        if let Some(expires) = r.expires_at {
            println!("     expires: {expires}");
        }
        println!("     source:  {}  added {}  universal {}", r.source, r.added_at, r.is_universal);
        if let Some(score) = scraped.score {
            println!("     score:   {score}");
        }
    }

    Ok(())
}
