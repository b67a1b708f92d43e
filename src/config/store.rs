//! Content store connection settings, read from the environment

use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

use crate::helpers::ImageUrls;

pub const PROJECT_ID_VAR: &str = "SANITY_PROJECT_ID";
pub const DATASET_VAR: &str = "SANITY_DATASET";
pub const USE_CDN_VAR: &str = "SANITY_USE_CDN";
pub const TOKEN_VAR: &str = "SANITY_API_TOKEN";
pub const API_VERSION_VAR: &str = "SANITY_API_VERSION";
pub const TIMEOUT_VAR: &str = "STORE_TIMEOUT_SECS";
pub const APP_ENV_VAR: &str = "APP_ENV";

const DEFAULT_DATASET: &str = "production";
const DEFAULT_API_VERSION: &str = "2021-10-21";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

lazy_static! {
    static ref PROJECT_ID: Regex = Regex::new(r"^[a-z0-9-]+$").unwrap();
    static ref DATASET: Regex = Regex::new(r"^[a-z0-9][a-z0-9_-]{0,63}$").unwrap();
    static ref API_VERSION: Regex = Regex::new(r"^(1|\d{4}-\d{2}-\d{2})$").unwrap();
}

/// Named configuration failures, reported at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Connection settings for the hosted content store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub project_id: String,
    pub dataset: String,
    /// Serve reads from the CDN host
    pub use_cdn: bool,
    /// Write-capable token; reads work without it
    pub token: Option<String>,
    pub api_version: String,
    pub timeout: Duration,
}

impl StoreConfig {
    /// Load from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project_id = get(PROJECT_ID_VAR).ok_or(ConfigError::Missing(PROJECT_ID_VAR))?;
        if !PROJECT_ID.is_match(&project_id) {
            return Err(ConfigError::Invalid {
                var: PROJECT_ID_VAR,
                reason: "only lowercase letters, digits and dashes are allowed".to_string(),
            });
        }

        let dataset = get(DATASET_VAR).unwrap_or_else(|| DEFAULT_DATASET.to_string());
        if !DATASET.is_match(&dataset) {
            return Err(ConfigError::Invalid {
                var: DATASET_VAR,
                reason: format!("{:?} is not a valid dataset name", dataset),
            });
        }

        let use_cdn = match get(USE_CDN_VAR) {
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::Invalid {
                var: USE_CDN_VAR,
                reason: format!("expected true or false, got {:?}", value),
            })?,
            None => get(APP_ENV_VAR).as_deref() == Some("production"),
        };

        let api_version = get(API_VERSION_VAR).unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        if !API_VERSION.is_match(&api_version) {
            return Err(ConfigError::Invalid {
                var: API_VERSION_VAR,
                reason: "expected a date like 2021-10-21".to_string(),
            });
        }

        let timeout = match get(TIMEOUT_VAR) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::Invalid {
                    var: TIMEOUT_VAR,
                    reason: format!("expected a positive number of seconds, got {:?}", value),
                })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            project_id,
            dataset,
            use_cdn,
            token: get(TOKEN_VAR),
            api_version,
            timeout,
        })
    }

    /// The write token, or the error naming the variable to set
    pub fn write_token(&self) -> Result<&str, ConfigError> {
        self.token.as_deref().ok_or(ConfigError::Missing(TOKEN_VAR))
    }

    /// Image URL builder for this project and dataset
    pub fn images(&self) -> ImageUrls {
        ImageUrls::new(&self.project_id, &self.dataset)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
