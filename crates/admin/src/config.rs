//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Data source
//! - `ORDERDESK_DATA_SOURCE` - `remote` (default) or `synthetic` (demo mode)
//! - `ORDERDESK_API_URL` - Backend base URL (required when remote)
//! - `ORDERDESK_API_TOKEN` - Bearer token for the backend (optional, validated)
//! - `ORDERDESK_REQUEST_TIMEOUT_SECS` - HTTP timeout (default: 15)
//! - `ORDERDESK_SYNTHETIC_SEED` - Seed for demo data (default: 42)
//! - `ORDERDESK_SYNTHETIC_COUNT` - Number of demo orders (default: 25)
//!
//! ## Store
//! - `ORDERDESK_PAGE_SIZE` - Rows per listing page (default: 10)
//! - `ORDERDESK_FETCH_LIMIT` - Orders requested per server page (default: 100)
//! - `ORDERDESK_POLL_INTERVAL_SECS` - Background refresh period, 0 disables (default: 30)
//!
//! ## Observability
//! - `ORDERDESK_LOG_JSON` - Emit JSON logs when set to `1`/`true`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_FETCH_LIMIT: u32 = 100;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SYNTHETIC_SEED: u64 = 42;
const DEFAULT_SYNTHETIC_COUNT: usize = 25;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
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

/// Which backend the order store talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSourceMode {
    /// The real REST backend.
    #[default]
    Remote,
    /// Deterministic in-memory demo data.
    Synthetic,
}

impl std::str::FromStr for DataSourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "synthetic" | "demo" => Ok(Self::Synthetic),
            other => Err(format!("expected `remote` or `synthetic`, got `{other}`")),
        }
    }
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Selected data source
    pub data_source: DataSourceMode,
    /// Backend API settings (present when `data_source` is remote)
    pub api: Option<ApiConfig>,
    /// Synthetic demo data settings
    pub synthetic: SyntheticConfig,
    /// Order store settings
    pub store: StoreConfig,
    /// Background refresh period (`None` disables polling)
    pub poll_interval: Option<Duration>,
    /// Emit JSON formatted logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

/// Backend REST API configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.example.net/api/admin/`
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    /// Config for a base URL with no token and the default timeout.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Synthetic (demo) data source configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub count: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SYNTHETIC_SEED,
            count: DEFAULT_SYNTHETIC_COUNT,
        }
    }
}

/// Order store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Rows per listing page.
    pub page_size: usize,
    /// Orders requested from the backend per load.
    pub fetch_limit: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_mode(None)
    }

    /// Load configuration from environment variables, with the data source
    /// mode forced when `mode` is given.
    ///
    /// A forced mode replaces `ORDERDESK_DATA_SOURCE` before anything else is
    /// read, so synthetic mode never asks for backend settings.
    ///
    /// # Errors
    ///
    /// Same as [`AdminConfig::from_env`].
    pub fn from_env_with_mode(mode: Option<DataSourceMode>) -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup_with_mode(|key| std::env::var(key).ok(), mode)
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AdminConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_with_mode(lookup, None)
    }

    /// Build configuration from a lookup, with the data source mode forced
    /// when `mode` is given.
    ///
    /// # Errors
    ///
    /// Same as [`AdminConfig::from_env`].
    pub fn from_lookup_with_mode<F>(
        lookup: F,
        mode: Option<DataSourceMode>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let data_source = match mode {
            Some(mode) => mode,
            None => env
                .or_default("ORDERDESK_DATA_SOURCE", "remote")
                .parse::<DataSourceMode>()
                .map_err(|e| {
                    ConfigError::InvalidEnvVar("ORDERDESK_DATA_SOURCE".to_string(), e)
                })?,
        };

        let api = match data_source {
            DataSourceMode::Remote => Some(ApiConfig::from_env(&env)?),
            DataSourceMode::Synthetic => None,
        };

        let synthetic = SyntheticConfig {
            seed: env.parsed("ORDERDESK_SYNTHETIC_SEED", DEFAULT_SYNTHETIC_SEED)?,
            count: env.parsed("ORDERDESK_SYNTHETIC_COUNT", DEFAULT_SYNTHETIC_COUNT)?,
        };

        let page_size: usize = env.parsed("ORDERDESK_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ORDERDESK_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let store = StoreConfig {
            page_size,
            fetch_limit: env.parsed("ORDERDESK_FETCH_LIMIT", DEFAULT_FETCH_LIMIT)?,
        };

        let poll_secs: u64 = env.parsed("ORDERDESK_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let poll_interval = (poll_secs > 0).then(|| Duration::from_secs(poll_secs));

        let log_json = env
            .optional("ORDERDESK_LOG_JSON")
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"));

        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            data_source,
            api,
            synthetic,
            store,
            poll_interval,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
        })
    }
}

impl ApiConfig {
    fn from_env<F>(env: &Env<'_, F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = env.required("ORDERDESK_API_URL")?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("ORDERDESK_API_URL".to_string(), e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "ORDERDESK_API_URL".to_string(),
                format!("unsupported scheme `{}`", base_url.scheme()),
            ));
        }

        let token = env
            .optional("ORDERDESK_API_TOKEN")
            .map(|token| {
                validate_secret_strength(&token, "ORDERDESK_API_TOKEN")?;
                Ok::<_, ConfigError>(SecretString::from(token))
            })
            .transpose()?;

        let timeout_secs: u64 =
            env.parsed("ORDERDESK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        Ok(Self {
            base_url,
            token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Thin wrapper over a variable lookup function.
struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a generated token."
            ),
        ));
    }

    Ok(())
}
