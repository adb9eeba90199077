//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_UPSTREAM_URL` - Origin served through the caching worker (edge proxy only)
//! - `SEARCH_API_URL` - Search backend base URL (search clients only)
//! - `SEARCH_API_KEY` - Search backend API key (search clients only)
//!
//! ## Optional
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 3000)
//! - `BAZAAR_CACHE_PREFIX` - Cache namespace prefix (default: bazaar)
//! - `BAZAAR_CACHE_VERSION` - Cache namespace version (default: v1)
//! - `BAZAAR_CACHE_CAPACITY` - Max entries per namespace (default: 1000)
//! - `BAZAAR_STATIC_MANIFEST` - Comma-separated static asset paths precached on install
//! - `SEARCH_DEBOUNCE_MS` - Search debounce interval (default: 300)
//! - `SEARCH_PAGE_SIZE` - Search page size (default: 20)
//! - `SEARCH_ERROR_MESSAGE` - User-facing message shown when a search fails
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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
    "enter-",
    "put-your",
    "add-your",
];

/// Default static assets precached on install.
const DEFAULT_STATIC_MANIFEST: &[&str] = &["/manifest.json", "/favicon.ico"];

/// Path segments that mark a request as an API call.
const DEFAULT_API_MARKERS: &[&str] = &["/api/", "/rest/v1/", "/functions/v1/"];

/// Default message shown when a search request fails.
pub const DEFAULT_SEARCH_ERROR_MESSAGE: &str =
    "Something went wrong while searching. Please try again.";

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

/// Edge proxy configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Caching worker configuration (includes the upstream origin)
    pub worker: WorkerConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Caching worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Origin whose requests are intercepted; everything else passes through.
    pub origin: Url,
    /// Namespace name prefix.
    pub cache_prefix: String,
    /// Namespace version; bumping it invalidates every namespace on activation.
    pub cache_version: String,
    /// Maximum number of entries kept per namespace.
    pub cache_capacity: u64,
    /// Static build artifacts precached on install.
    pub static_manifest: Vec<String>,
    /// App shell document seeded on install and used as the navigation fallback.
    pub shell_path: String,
    /// Path segments identifying API requests.
    pub api_markers: Vec<String>,
    /// Image entries older than this are evicted by the sweep.
    pub image_max_age: TimeDelta,
    /// Interval between image sweeps.
    pub sweep_interval: Duration,
}

/// Search coordinator tuning.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Quiet interval before a search request is issued.
    pub debounce: Duration,
    /// Products per page.
    pub page_size: u32,
    /// Message exposed to the UI when a search fails.
    pub error_message: String,
}

/// Search backend connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SearchBackendConfig {
    /// Base URL of the search service (always ends with `/`).
    pub base_url: Url,
    /// API key sent with every request.
    pub api_key: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for SearchBackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchBackendConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
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
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default("BAZAAR_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("BAZAAR_PORT", "3000")?;
        let origin = parse_url(&get_required_env("BAZAAR_UPSTREAM_URL")?, "BAZAAR_UPSTREAM_URL")?;
        let worker = WorkerConfig::from_env(origin)?;

        Ok(Self {
            host,
            port,
            worker,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl WorkerConfig {
    /// Defaults for the given origin.
    #[must_use]
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cache_prefix: "bazaar".to_string(),
            cache_version: "v1".to_string(),
            cache_capacity: 1000,
            static_manifest: DEFAULT_STATIC_MANIFEST
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            shell_path: "/".to_string(),
            api_markers: DEFAULT_API_MARKERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            image_max_age: TimeDelta::days(7),
            sweep_interval: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Load overrides from the environment on top of [`WorkerConfig::new`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for unparsable values.
    pub fn from_env(origin: Url) -> Result<Self, ConfigError> {
        let defaults = Self::new(origin);

        let static_manifest = get_optional_env("BAZAAR_STATIC_MANIFEST")
            .map_or(defaults.static_manifest, |raw| split_list(&raw));

        Ok(Self {
            cache_prefix: get_env_or_default("BAZAAR_CACHE_PREFIX", &defaults.cache_prefix),
            cache_version: get_env_or_default("BAZAAR_CACHE_VERSION", &defaults.cache_version),
            cache_capacity: parse_env_or_default("BAZAAR_CACHE_CAPACITY", "1000")?,
            static_manifest,
            ..defaults
        })
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            page_size: 20,
            error_message: DEFAULT_SEARCH_ERROR_MESSAGE.to_string(),
        }
    }
}

impl SearchConfig {
    /// Load from environment, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for unparsable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let debounce_ms: u64 = parse_env_or_default("SEARCH_DEBOUNCE_MS", "300")?;
        let page_size: u32 = parse_env_or_default("SEARCH_PAGE_SIZE", "20")?;
        if page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SEARCH_PAGE_SIZE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            debounce: Duration::from_millis(debounce_ms),
            page_size,
            error_message: get_env_or_default("SEARCH_ERROR_MESSAGE", DEFAULT_SEARCH_ERROR_MESSAGE),
        })
    }
}

impl SearchBackendConfig {
    /// Create a backend config; a trailing `/` is added to the base URL if missing.
    #[must_use]
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            api_key,
            timeout: Duration::from_secs(10),
        }
    }

    /// Load from `SEARCH_API_URL` and `SEARCH_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either variable is missing, the URL is invalid,
    /// or the key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let base_url = parse_url(&get_required_env("SEARCH_API_URL")?, "SEARCH_API_URL")?;
        let api_key = get_validated_secret("SEARCH_API_KEY")?;
        Ok(Self::new(base_url, api_key))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, using `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_url(raw: &str, key: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
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
    let len = s.len() as f64;
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
