use crate::error::{AppError, Result};
use std::time::Duration;

pub const ENV_BASE_URL: &str = "CARRIER_BASE_URL";
pub const ENV_API_KEY: &str = "CARRIER_API_KEY";
pub const ENV_PACKAGE_ID: &str = "CARRIER_QUOTE_PACKAGE_ID";
pub const ENV_TIMEOUT_SECS: &str = "CARRIER_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the remote carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub package_id: Option<String>,
    pub timeout: Duration,
}

impl CarrierConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            package_id: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_package_id(mut self, package_id: Option<String>) -> Self {
        self.package_id = package_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the carrier settings from `CARRIER_*` variables resolved by
    /// `lookup`. Returns `Ok(None)` when no base URL is configured.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(base_url) = lookup(ENV_BASE_URL).filter(|url| !url.trim().is_empty()) else {
            return Ok(None);
        };
        let timeout = match lookup(ENV_TIMEOUT_SECS) {
            Some(raw) => parse_timeout_secs(&raw)?,
            None => DEFAULT_TIMEOUT,
        };
        Ok(Some(
            Self::new(base_url.trim())
                .with_api_key(lookup(ENV_API_KEY))
                .with_package_id(lookup(ENV_PACKAGE_ID))
                .with_timeout(timeout),
        ))
    }
}

pub fn parse_timeout_secs(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(AppError::ConfigError(format!(
            "{ENV_TIMEOUT_SECS} must be a positive number of seconds, got '{raw}'"
        ))),
    }
}
