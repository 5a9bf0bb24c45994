//! Client configuration, read from the environment.

use std::time::Duration;

use tradeops_infra::CoreConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the backing service, without a trailing slash.
    pub api_url: String,
    /// Bearer token sent with every request, if set.
    pub token: Option<String>,
    pub request_timeout: Duration,
    pub core: CoreConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
            core: CoreConfig::default(),
        }
    }
}

impl ClientConfig {
    /// `TRADEOPS_API_URL`, `TRADEOPS_AUTH_TOKEN`, `TRADEOPS_HTTP_TIMEOUT_SECS`, plus the
    /// core settings (see [`CoreConfig::from_env`]).
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = std::env::var("TRADEOPS_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.api_url);
        let token = std::env::var("TRADEOPS_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        let request_timeout = match std::env::var("TRADEOPS_HTTP_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %raw, "ignoring invalid TRADEOPS_HTTP_TIMEOUT_SECS");
                    defaults.request_timeout
                }
            },
            Err(_) => defaults.request_timeout,
        };

        Self {
            api_url: normalize_base_url(&api_url),
            token,
            request_timeout,
            core: CoreConfig::from_env(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl AsRef<str>) -> Self {
        self.api_url = normalize_base_url(api_url.as_ref());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
