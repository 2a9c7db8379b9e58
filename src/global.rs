use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::config::Settings;

pub struct Global {
    pub config: Settings,
    pub http_client: reqwest::Client,
}

impl Global {
    pub fn init(config: Settings) -> anyhow::Result<Arc<Self>> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.http.user_agent.as_str())
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()
            .context("http client")?;

        Ok(Arc::new(Self { config, http_client }))
    }
}
