//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TABLESIDE_SERVER_URL` - Base URL of the order server (a trailing
//!   slash is added if missing, so path-based bases keep their full path
//!   when endpoints are joined)
//!
//! ## Optional
//! - `TABLESIDE_ORDER_LIMIT` - Maximum total item quantity per cart (default: 50)
//! - `TABLESIDE_SYNC_DEBOUNCE_MS` - Debounce window for cart saves (default: 800)
//! - `TABLESIDE_MENU_TTL_SECS` - Menu cache time-to-live (default: 300)
//! - `TABLESIDE_DATA_DIR` - Override for the durable storage directory
//!   (default: platform data dir + `tableside/`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_ORDER_LIMIT: u32 = 50;
const DEFAULT_SYNC_DEBOUNCE_MS: u64 = 800;
const DEFAULT_MENU_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("No platform data directory available; set TABLESIDE_DATA_DIR")]
    NoDataDir,
}

/// Tableside client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the order server.
    pub server_url: Url,
    /// Maximum total item quantity permitted in a cart at once.
    pub order_limit: u32,
    /// How long bursts of cart edits are coalesced before syncing.
    pub sync_debounce: Duration,
    /// Menu cache time-to-live.
    pub menu_ttl: Duration,
    /// Directory for durable client storage.
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if no durable storage directory can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let server_url = parse_server_url(&get_required_env("TABLESIDE_SERVER_URL")?)?;

        let order_limit = parse_order_limit(&get_env_or_default(
            "TABLESIDE_ORDER_LIMIT",
            &DEFAULT_ORDER_LIMIT.to_string(),
        ))?;

        let sync_debounce_ms = get_env_or_default(
            "TABLESIDE_SYNC_DEBOUNCE_MS",
            &DEFAULT_SYNC_DEBOUNCE_MS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("TABLESIDE_SYNC_DEBOUNCE_MS".to_string(), e.to_string())
        })?;

        let menu_ttl_secs = get_env_or_default(
            "TABLESIDE_MENU_TTL_SECS",
            &DEFAULT_MENU_TTL_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("TABLESIDE_MENU_TTL_SECS".to_string(), e.to_string())
        })?;

        let data_dir = match get_optional_env("TABLESIDE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            server_url,
            order_limit,
            sync_debounce: Duration::from_millis(sync_debounce_ms),
            menu_ttl: Duration::from_secs(menu_ttl_secs),
            data_dir,
            sentry_dsn,
        })
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
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and validate the order limit. Zero is rejected: a cart that can
/// hold nothing makes every add unrepresentable.
fn parse_order_limit(raw: &str) -> Result<u32, ConfigError> {
    let limit = raw.parse::<u32>().map_err(|e| {
        ConfigError::InvalidEnvVar("TABLESIDE_ORDER_LIMIT".to_string(), e.to_string())
    })?;
    if limit == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "TABLESIDE_ORDER_LIMIT".to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(limit)
}

/// Parse the server base URL, normalizing the path to end in `/`.
///
/// `Url::join` treats the last segment of a slash-less path as a file and
/// drops it (`/api` + `ping` → `/ping`), so a path-based base must end in a
/// slash before endpoints are joined onto it.
fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = raw.parse::<Url>().map_err(|e| {
        ConfigError::InvalidEnvVar("TABLESIDE_SERVER_URL".to_string(), e.to_string())
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Platform data directory for durable storage.
fn default_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|base| base.join("tableside"))
        .ok_or(ConfigError::NoDataDir)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_limit_valid() {
        assert_eq!(parse_order_limit("10").unwrap(), 10);
        assert_eq!(parse_order_limit("50").unwrap(), 50);
    }

    #[test]
    fn test_parse_order_limit_zero_rejected() {
        let err = parse_order_limit("0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_order_limit_garbage_rejected() {
        assert!(parse_order_limit("ten").is_err());
        assert!(parse_order_limit("-3").is_err());
    }

    #[test]
    fn test_parse_server_url_adds_trailing_slash() {
        let url = parse_server_url("https://orders.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://orders.example.com/api/");

        // Joining an endpoint keeps the base path intact
        assert_eq!(
            url.join("ping").unwrap().as_str(),
            "https://orders.example.com/api/ping"
        );
    }

    #[test]
    fn test_parse_server_url_keeps_existing_slash() {
        let url = parse_server_url("https://orders.example.com/api/").unwrap();
        assert_eq!(url.as_str(), "https://orders.example.com/api/");

        let url = parse_server_url("https://orders.example.com").unwrap();
        assert_eq!(url.as_str(), "https://orders.example.com/");
    }

    #[test]
    fn test_parse_server_url_rejects_garbage() {
        assert!(parse_server_url("not a url").is_err());
    }

    #[test]
    fn test_get_env_or_default_falls_back() {
        assert_eq!(
            get_env_or_default("TABLESIDE_TEST_UNSET_VAR", "800"),
            "800"
        );
    }
}
