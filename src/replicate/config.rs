//! Replicate configuration parsed from environment variables.

use std::time::Duration;

use crate::config::{Lookup, env_lookup, parse_or};
use crate::services::images::ServiceError;

pub const DEFAULT_REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";
pub const DEFAULT_REMBG_VERSION: &str =
    "cjwbw/rembg:fb8af171cfa1616ddcf1242c093f9c46bcada5ad4cf6f2fbe8b81b330ec5c003";
pub const DEFAULT_SDXL_VERSION: &str =
    "stability-ai/sdxl:39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b";
pub const DEFAULT_REPLICATE_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_REPLICATE_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REPLICATE_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicateConfig {
    pub api_token: String,
    /// API base URL, without a trailing slash.
    pub api_base: String,
    /// `owner/model:version` used for background removal.
    pub rembg_version: String,
    /// `owner/model:version` used for generation.
    pub sdxl_version: String,
    /// Overall deadline for one prediction, polling and download included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub poll_interval: Duration,
}

impl ReplicateConfig {
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] when no API token is set.
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(&env_lookup)
    }

    /// Required:
    /// - `REPLICATE_API_TOKEN`
    ///
    /// Optional:
    /// - `REPLICATE_API_BASE`
    /// - `REPLICATE_REMBG_VERSION`, `REPLICATE_SDXL_VERSION`
    /// - `REPLICATE_TIMEOUT_SECS`: default 180
    /// - `REPLICATE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `REPLICATE_POLL_INTERVAL_MS`: default 1000
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] when no API token is set.
    pub fn from_lookup(var: Lookup<'_>) -> Result<Self, ServiceError> {
        let non_empty = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_token =
            non_empty("REPLICATE_API_TOKEN").ok_or_else(|| ServiceError::Config("REPLICATE_API_TOKEN not set".into()))?;
        let api_base = non_empty("REPLICATE_API_BASE")
            .unwrap_or_else(|| DEFAULT_REPLICATE_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_token,
            api_base,
            rembg_version: non_empty("REPLICATE_REMBG_VERSION").unwrap_or_else(|| DEFAULT_REMBG_VERSION.to_string()),
            sdxl_version: non_empty("REPLICATE_SDXL_VERSION").unwrap_or_else(|| DEFAULT_SDXL_VERSION.to_string()),
            timeout: Duration::from_secs(parse_or(var, "REPLICATE_TIMEOUT_SECS", DEFAULT_REPLICATE_TIMEOUT_SECS)),
            connect_timeout: Duration::from_secs(parse_or(
                var,
                "REPLICATE_CONNECT_TIMEOUT_SECS",
                DEFAULT_REPLICATE_CONNECT_TIMEOUT_SECS,
            )),
            poll_interval: Duration::from_millis(parse_or(
                var,
                "REPLICATE_POLL_INTERVAL_MS",
                DEFAULT_REPLICATE_POLL_INTERVAL_MS,
            )),
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
