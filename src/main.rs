use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use shift_codes::config::Settings;
use shift_codes::global::Global;
use shift_codes::scraper::{self, RunOptions, RunSummary, SourceKind};
use shift_codes::util;

#[derive(Debug, Parser)]
#[command(name = "shift-codes", version, about = "Collect SHiFT codes into the site's code list")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch sources and add the codes the store doesn't have yet
    Fetch {
        /// Sources to fetch, every enabled one when omitted
        #[arg(value_enum)]
        sources: Vec<SourceKind>,

        /// Store file to use instead of the configured one
        #[arg(long)]
        store: Option<PathBuf>,

        /// Print the new entries instead of writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Mark stored codes past their expiration date as expired
    Expire {
        #[arg(long)]
        store: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Settings::new()?;

    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .parse_lossy(&config.logging.level),
        )
        .init();

    let (Command::Fetch { store, .. } | Command::Expire { store, .. }) = &cli.command;
    if let Some(path) = store {
        config.store.path = path.clone();
    }

    if let Err(e) = run(cli.command, config).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Command, config: Settings) -> anyhow::Result<()> {
    let today = util::today();

    match command {
        Command::Fetch { sources, dry_run, .. } => {
            let sources = if sources.is_empty() {
                SourceKind::ALL
                    .into_iter()
                    .filter(|kind| kind.enabled(&config.sources))
                    .collect()
            } else {
                sources
            };

            tracing::info!(?sources, dry_run, "starting fetch");

            let global = Global::init(config)?;
            let summary = scraper::run(&global, &RunOptions { sources, dry_run }, today).await?;

            print_summary(&summary, today);
        }
        Command::Expire { dry_run, .. } => {
            let global = Global::init(config)?;
            let stale = scraper::expire(&global, today, dry_run)?;

            if stale.is_empty() {
                println!("Every stored code is up to date.");
            } else {
                let verb = if dry_run { "Would mark" } else { "Marked" };
                println!("{verb} {} code(s) as expired:", stale.len());
                for entry in &stale {
                    println!("  {} (was {}, expired {})", entry.code, entry.status, entry.expires_at);
                }
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, today: NaiveDate) {
    if !summary.failed.is_empty() {
        let failed: Vec<&str> = summary.failed.iter().map(|k| k.name()).collect();
        println!("Skipped failing sources: {}", failed.join(", "));
    }

    if summary.added.is_empty() {
        println!("No new codes found ({} scraped).", summary.scraped);
        return;
    }

    println!("Added {} new code(s):", summary.added.len());
    for record in &summary.added {
        println!(
            "  {}  {:<11} {:<8} {}",
            record.code,
            record.game.as_str(),
            record.status.as_str(),
            record.reward
        );
    }

    println!();
    for (game, count, active) in summary.by_game(today) {
        println!("  {}: {count} new, {active} likely active", game.display_name());
    }

    if let Some(preview) = &summary.preview {
        println!("\nDry run, store not written. Entries:{preview}");
    }
}
