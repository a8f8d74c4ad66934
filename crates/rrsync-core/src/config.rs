//! Configuration types for rrsync
//!
//! One [`StoreConfig`] describes how to reach a registrar and how fast calls
//! to it may be issued.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::ratelimit::{FixedWindow, RateLimiter, TokenBucket};

/// Registrar access configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the registrar API, without the `/v1` suffix
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key
    pub api_key: String,

    /// API secret
    pub api_secret: String,

    /// Timeout of a single HTTP request (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Pacing of outbound calls
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Live or dry-run
    #[serde(default)]
    pub mode: StoreMode,
}

impl StoreConfig {
    /// Create a configuration for `api_url` with default pacing and timeout
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            http_timeout_secs: default_http_timeout_secs(),
            rate_limit: RateLimitConfig::default(),
            mode: StoreMode::default(),
        }
    }

    /// Set the store mode
    pub fn with_mode(mut self, mode: StoreMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the rate limit
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// HTTP request timeout as a [`Duration`]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_url.is_empty() {
            return Err(Error::config("API URL cannot be empty"));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(Error::config(format!(
                "API URL must start with http:// or https://, got '{}'",
                self.api_url
            )));
        }
        if self.api_key.is_empty() {
            return Err(Error::config("API key cannot be empty"));
        }
        if self.api_secret.is_empty() {
            return Err(Error::config("API secret cannot be empty"));
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::config("HTTP timeout must be > 0"));
        }
        self.rate_limit.validate()
    }
}

// Custom Debug implementation to prevent credential leakage in logs
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("rate_limit", &self.rate_limit)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Whether writes reach the registrar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    /// Issue every call
    #[default]
    Live,
    /// Issue reads, log writes without sending them
    DryRun,
}

impl std::str::FromStr for StoreMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(StoreMode::Live),
            "dry_run" | "dry-run" | "dryrun" => Ok(StoreMode::DryRun),
            other => Err(Error::config(format!(
                "unknown store mode '{}', expected live or dry_run",
                other
            ))),
        }
    }
}

/// How outbound calls are paced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    /// `burst` calls at once, then `requests_per_second`
    #[default]
    TokenBucket,
    /// `burst` calls per `window_secs` window
    FixedWindow,
}

impl std::str::FromStr for RateLimitStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bucket" | "token_bucket" | "token-bucket" => Ok(RateLimitStrategy::TokenBucket),
            "window" | "fixed_window" | "fixed-window" => Ok(RateLimitStrategy::FixedWindow),
            other => Err(Error::config(format!(
                "unknown rate limit strategy '{}', expected token_bucket or fixed_window",
                other
            ))),
        }
    }
}

/// Rate limiter parameters
///
/// The registrar allows 60 requests per minute; the default bucket lets a
/// full minute's worth through at once and then one request per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Limiter kind
    #[serde(default)]
    pub strategy: RateLimitStrategy,

    /// Tokens earned per second (token bucket)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Bucket size, or calls per window
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Window length in seconds (fixed window)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl RateLimitConfig {
    /// Validate the rate limit
    pub fn validate(&self) -> Result<(), Error> {
        if self.burst == 0 {
            return Err(Error::config("burst must be > 0"));
        }
        match self.strategy {
            RateLimitStrategy::TokenBucket if self.requests_per_second == 0 => {
                Err(Error::config("requests per second must be > 0"))
            }
            RateLimitStrategy::FixedWindow if self.window_secs == 0 => {
                Err(Error::config("rate limit window must be > 0"))
            }
            _ => Ok(()),
        }
    }

    /// Build the limiter described by this configuration
    pub fn build(&self) -> Result<Arc<dyn RateLimiter>, Error> {
        self.validate()?;
        Ok(match self.strategy {
            RateLimitStrategy::TokenBucket => {
                Arc::new(TokenBucket::per_second(self.requests_per_second, self.burst)?)
            }
            RateLimitStrategy::FixedWindow => Arc::new(FixedWindow::new(
                self.burst,
                Duration::from_secs(self.window_secs),
            )?),
        })
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            strategy: RateLimitStrategy::default(),
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.godaddy.com".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_requests_per_second() -> u32 {
    1
}

fn default_burst() -> u32 {
    60
}

fn default_window_secs() -> u64 {
    60
}
