//! Configuration loading and representation.

use std::time::Duration;

/// Knobs of the core services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Attempts at the patch leg of a file attach (at least 1).
    pub attach_patch_attempts: u32,
    /// Delay before the first patch retry; doubled after each failure.
    pub attach_retry_backoff: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            attach_patch_attempts: 3,
            attach_retry_backoff: Duration::from_millis(200),
        }
    }
}

impl CoreConfig {
    /// Load from `TRADEOPS_ATTACH_ATTEMPTS` / `TRADEOPS_ATTACH_BACKOFF_MS`, falling back
    /// to defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            attach_patch_attempts: env_parse("TRADEOPS_ATTACH_ATTEMPTS")
                .map(|n: u32| n.max(1))
                .unwrap_or(defaults.attach_patch_attempts),
            attach_retry_backoff: env_parse("TRADEOPS_ATTACH_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.attach_retry_backoff),
        }
    }

    /// No waiting between retries (tests).
    pub fn without_backoff(mut self) -> Self {
        self.attach_retry_backoff = Duration::ZERO;
        self
    }
}

fn env_parse<T: core::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
