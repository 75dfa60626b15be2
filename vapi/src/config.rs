//! Provider block resolution
//!
//! Explicit provider attributes win over environment variables, which win over
//! built-in defaults. Empty strings count as unset at every level.

use tfplug::Config;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.vapi.ai";
pub const ENV_URL: &str = "VAPI_URL";
pub const ENV_API_KEY: &str = "VAPI_API_KEY";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unable to find token")]
    MissingToken,

    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ConfigError {
    /// Explanation shown as diagnostic detail
    pub fn detail(&self) -> String {
        match self {
            ConfigError::MissingToken => format!(
                "Set `token` (or `api_key`) in the provider block, or the {} environment variable",
                ENV_API_KEY
            ),
            ConfigError::InvalidUrl { reason, .. } => reason.clone(),
        }
    }
}

/// Connection settings resolved from the provider block and environment
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub token: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    pub fn resolve(
        config: &Config,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let attr = |name: &str| {
            config
                .get_string(name)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let var = |name: &str| env(name).filter(|s| !s.is_empty());

        let base_url = attr("url")
            .or_else(|| var(ENV_URL))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let parsed = url::Url::parse(&base_url).map_err(|e| ConfigError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: base_url,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let token = attr("token")
            .or_else(|| attr("api_key"))
            .or_else(|| var(ENV_API_KEY))
            .ok_or(ConfigError::MissingToken)?;

        Ok(Self { base_url, token })
    }

    pub fn from_env(config: &Config) -> Result<Self, ConfigError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }
}
