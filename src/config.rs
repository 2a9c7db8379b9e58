use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::games::Game;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// Text the new entries are inserted after. Only used by the
    /// TypeScript store.
    pub marker: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("src/data/shiftCodes.ts"),
            marker: crate::store::DEFAULT_MARKER.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "BorderlandsLootHub/1.0 (Code Aggregator)".into(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Game8Config {
    pub enabled: bool,
    pub url: String,
    pub label: String,
    pub default_game: Game,
}

impl Default for Game8Config {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://game8.co/games/Borderlands-4/archives/548406".into(),
            label: "game8.co".into(),
            default_game: Game::Bl4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub enabled: bool,
    pub base_url: String,
    pub subreddit: String,
    pub sorts: Vec<String>,
    pub limit: u32,
    pub default_game: Game,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://www.reddit.com".into(),
            subreddit: "Borderlandsshiftcodes".into(),
            sorts: vec!["hot".into(), "new".into()],
            limit: 50,
            default_game: Game::Bl4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterAccount {
    pub username: String,
    pub display_name: String,
}

impl TwitterAccount {
    fn new(username: &str, display_name: &str) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub enabled: bool,
    pub api_base: String,
    /// Name of the environment variable holding the bearer token.
    pub bearer_token_env: String,
    pub accounts: Vec<TwitterAccount>,
    pub lookback_days: i64,
    pub max_results: u32,
    pub account_delay_ms: u64,
    pub default_game: Game,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.twitter.com/2".into(),
            bearer_token_env: "TWITTER_BEARER_TOKEN".into(),
            accounts: vec![
                TwitterAccount::new("Borderlands", "@Borderlands (Official)"),
                TwitterAccount::new("ShiftCodesTK", "@ShiftCodesTK"),
                TwitterAccount::new("borderlands4HQ", "@borderlands4HQ"),
                TwitterAccount::new("DuvalMagic", "@DuvalMagic (Randy Pitchford)"),
            ],
            lookback_days: 30,
            max_results: 50,
            account_delay_ms: 1000,
            default_game: Game::Bl3,
        }
    }
}

impl TwitterConfig {
    pub fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.bearer_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub game8: Game8Config,
    pub reddit: RedditConfig,
    pub twitter: TwitterConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub http: HttpConfig,
    pub sources: SourcesConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config/default.yaml").required(false))
            .add_source(File::with_name("config/local.yaml").required(false))
            .add_source(Environment::with_prefix("SHIFT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
