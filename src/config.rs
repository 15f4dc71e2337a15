use std::time::Duration;

use anyhow::{Context, Result};

/// Startup configuration, read once in `main` and handed to everything that
/// needs it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: String,
    pub guild_id: Option<u64>,
    /// GraphQL endpoint of the dataset API.
    pub api_url: String,
    pub auth: AuthConfig,
    /// Where the identity provider sends curators after logout.
    pub app_url: String,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub domain: String,
    pub client_id: String,
    pub audience: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests don't touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").context("DISCORD_TOKEN required")?;
        let api_url = get("API_URL").context("API_URL required")?;
        let guild_id = get("DISCORD_GUILD_ID").and_then(|s| s.parse::<u64>().ok());

        let auth = AuthConfig {
            domain: get("AUTH0_DOMAIN").unwrap_or_default(),
            client_id: get("AUTH0_CLIENT_ID").unwrap_or_default(),
            audience: get("AUTH0_AUDIENCE"),
        };

        let app_url = get("APP_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let http_timeout = get("HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            discord_token,
            guild_id,
            api_url,
            auth,
            app_url,
            http_timeout,
        })
    }
}

impl AuthConfig {
    pub fn is_configured(&self) -> bool {
        !self.domain.is_empty() && !self.client_id.is_empty()
    }

    /// `https://<domain>` with any scheme or trailing slash in the env value tolerated.
    pub fn base_url(&self) -> String {
        let domain = self
            .domain
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        format!("https://{}", domain)
    }
}
