//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MAISON_GATEWAY_URL` - Base URL of the remote data gateway
//! - `MAISON_GATEWAY_KEY` - Gateway API key (anonymous role; min 32 chars)
//!
//! ## Optional
//! - `MAISON_GATEWAY_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `MAISON_ORPHAN_REPLIES` - What to do with replies whose parent is
//!   missing from a fetch batch: `drop` (default) or `promote`

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::reviews::tree::OrphanPolicy;

const MIN_GATEWAY_KEY_LENGTH: usize = 32;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Remote data gateway connection settings
    pub gateway: GatewayConfig,
    /// Policy for replies whose parent is absent from a fetch batch
    pub orphan_policy: OrphanPolicy,
}

/// Remote data gateway connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway (e.g., <https://data.maisonrose.shop>)
    pub url: Url,
    /// API key sent with every request (anonymous role)
    pub key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url.as_str())
            .field("key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the gateway key fails validation (placeholder detection, minimum
    /// length).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let url_raw = require_env("MAISON_GATEWAY_URL")?;
        let url = Url::parse(&url_raw).map_err(|e| {
            ConfigError::InvalidEnvVar("MAISON_GATEWAY_URL".to_string(), e.to_string())
        })?;

        let key = require_env("MAISON_GATEWAY_KEY")?;
        validate_gateway_key("MAISON_GATEWAY_KEY", &key)?;

        let timeout_secs = match optional_env("MAISON_GATEWAY_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("MAISON_GATEWAY_TIMEOUT_SECS".to_string(), e.to_string())
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let orphan_policy = match optional_env("MAISON_ORPHAN_REPLIES") {
            Some(raw) => raw.parse::<OrphanPolicy>().map_err(|e| {
                ConfigError::InvalidEnvVar("MAISON_ORPHAN_REPLIES".to_string(), e)
            })?,
            None => OrphanPolicy::default(),
        };

        Ok(Self {
            gateway: GatewayConfig {
                url,
                key: SecretString::from(key),
                timeout: Duration::from_secs(timeout_secs),
            },
            orphan_policy,
        })
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Reject gateway keys that are too short or look like placeholders.
fn validate_gateway_key(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.len() < MIN_GATEWAY_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            name.to_string(),
            format!("must be at least {MIN_GATEWAY_KEY_LENGTH} characters"),
        ));
    }

    let lowered = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lowered.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                name.to_string(),
                format!("contains placeholder pattern \"{pattern}\""),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_KEY: &str = "zq8vj3kx9mwl5trn2hfy7bcp4dgs6aqe";

    #[test]
    fn test_valid_key_accepted() {
        assert!(validate_gateway_key("KEY", GOOD_KEY).is_ok());
    }

    #[test]
    fn test_short_key_rejected() {
        let err = validate_gateway_key("KEY", "short").expect_err("should reject");
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_placeholder_key_rejected() {
        let err = validate_gateway_key("KEY", "your-gateway-key-goes-right-here-ok")
            .expect_err("should reject");
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = GatewayConfig {
            url: Url::parse("https://data.example.invalid").expect("url"),
            key: SecretString::from(GOOD_KEY.to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(GOOD_KEY));
    }
}
