use std::sync::Arc;

use chrono::NaiveDate;

use crate::codes::ScrapedCode;
use crate::config::SourcesConfig;
use crate::error::Result;
use crate::global::Global;

pub mod game8;
pub mod reddit;
pub mod twitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SourceKind {
    Game8,
    Reddit,
    Twitter,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [Self::Game8, Self::Reddit, Self::Twitter];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Game8 => "game8",
            Self::Reddit => "reddit",
            Self::Twitter => "twitter",
        }
    }

    pub fn enabled(&self, config: &SourcesConfig) -> bool {
        match self {
            Self::Game8 => config.game8.enabled,
            Self::Reddit => config.reddit.enabled,
            Self::Twitter => config.twitter.enabled,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub async fn scrape(global: &Arc<Global>, kind: SourceKind, today: NaiveDate) -> Result<Vec<ScrapedCode>> {
    match kind {
        SourceKind::Game8 => game8::scrape(global, today).await,
        SourceKind::Reddit => reddit::scrape(global, today).await,
        SourceKind::Twitter => twitter::scrape(global, today).await,
    }
}
