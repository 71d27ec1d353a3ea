use serde::Deserialize;
use std::time::Duration;

use crate::models::{ListLimits, WeightTable};

/// Client configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Origin plus API prefix of the blog backend
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-call timeout applied by the gateway
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Scheme placed before the token in the Authorization header
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,

    /// Token to start the session with, if any
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_personalized_limit")]
    pub personalized_limit: u32,

    #[serde(default = "default_similar_limit")]
    pub similar_limit: u32,

    #[serde(default = "default_trending_limit")]
    pub trending_limit: u32,

    /// Lookback window for trending, in days
    #[serde(default = "default_trending_days")]
    pub trending_days: u32,

    #[serde(default = "default_view_weight")]
    pub view_weight: f64,

    #[serde(default = "default_comment_weight")]
    pub comment_weight: f64,

    #[serde(default = "default_like_weight")]
    pub like_weight: f64,

    #[serde(default = "default_bookmark_weight")]
    pub bookmark_weight: f64,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_auth_scheme() -> String {
    "Token".to_string()
}

fn default_personalized_limit() -> u32 {
    6
}

fn default_similar_limit() -> u32 {
    4
}

fn default_trending_limit() -> u32 {
    6
}

fn default_trending_days() -> u32 {
    7
}

fn default_view_weight() -> f64 {
    1.0
}

fn default_comment_weight() -> f64 {
    3.0
}

fn default_like_weight() -> f64 {
    4.0
}

fn default_bookmark_weight() -> f64 {
    5.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            auth_scheme: default_auth_scheme(),
            api_token: None,
            personalized_limit: default_personalized_limit(),
            similar_limit: default_similar_limit(),
            trending_limit: default_trending_limit(),
            trending_days: default_trending_days(),
            view_weight: default_view_weight(),
            comment_weight: default_comment_weight(),
            like_weight: default_like_weight(),
            bookmark_weight: default_bookmark_weight(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values that would otherwise only fail at first use
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_base_url.trim().is_empty() {
            anyhow::bail!("API_BASE_URL must not be empty");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be at least 1");
        }
        self.weights()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn limits(&self) -> ListLimits {
        ListLimits {
            personalized: self.personalized_limit,
            similar: self.similar_limit,
            trending: self.trending_limit,
            trending_days: self.trending_days,
        }
    }

    pub fn weights(&self) -> anyhow::Result<WeightTable> {
        WeightTable::new(
            self.view_weight,
            self.comment_weight,
            self.like_weight,
            self.bookmark_weight,
        )
        .map_err(|e| anyhow::anyhow!("Invalid interaction weights: {}", e))
    }
}
