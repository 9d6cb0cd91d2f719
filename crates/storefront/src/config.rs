//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront, used to build payment links
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_STORAGE_TIMEOUT_MS` - Per-call storage deadline (default: 5000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without a trailing slash
    pub base_url: String,
    /// Deadline applied to every storage call made by the order workflow
    pub storage_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Default storage deadline in milliseconds.
    pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5000;

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

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = env.database_url("STOREFRONT_DATABASE_URL")?;
        let host = env.parsed::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parsed::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = env
            .required("STOREFRONT_BASE_URL")?
            .trim_end_matches('/')
            .to_owned();
        let timeout_ms = env.parsed::<u64>(
            "STOREFRONT_STORAGE_TIMEOUT_MS",
            &Self::DEFAULT_STORAGE_TIMEOUT_MS.to_string(),
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_STORAGE_TIMEOUT_MS".to_owned(),
                "must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            storage_timeout: Duration::from_millis(timeout_ms),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.sample_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env.sample_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional, non-blank variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required environment variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value, parsed into `T`.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .as_deref()
            .unwrap_or(default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a Sentry sample rate, which must lie in `0.0..=1.0`.
    fn sample_rate(&self, key: &str, default: &str) -> Result<f32, ConfigError> {
        let rate = self.parsed::<f32>(key, default)?;
        if (0.0..=1.0).contains(&rate) {
            Ok(rate)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("{rate} is outside 0.0..=1.0"),
            ))
        }
    }

    /// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("STOREFRONT_DATABASE_URL", "postgres://localhost/plateshop"),
        ("STOREFRONT_BASE_URL", "https://plates.example.com/"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(MINIMAL).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.base_url, "https://plates.example.com");
        assert_eq!(config.storage_timeout, Duration::from_millis(5000));
        assert!(config.sentry_dsn.is_none());
        assert!((config.sentry_sample_rate - 1.0).abs() < f32::EPSILON);
        assert!(config.sentry_traces_sample_rate.abs() < f32::EPSILON);
        assert!(config.is_secure());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fly/plateshop"),
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.expose_secret(),
            "postgres://fly/plateshop"
        );
        assert!(!config.is_secure());
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("STOREFRONT_DATABASE_URL", "postgres://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "STOREFRONT_BASE_URL"));

        let err = load(&[("STOREFRONT_BASE_URL", "http://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "STOREFRONT_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("STOREFRONT_PORT", "not-a-port"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));

        let mut vars = MINIMAL.to_vec();
        vars.push(("STOREFRONT_STORAGE_TIMEOUT_MS", "0"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));

        let mut vars = MINIMAL.to_vec();
        vars.push(("SENTRY_SAMPLE_RATE", "1.5"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));
    }

    #[test]
    fn test_overrides() {
        let mut vars = MINIMAL.to_vec();
        vars.extend([
            ("STOREFRONT_HOST", "0.0.0.0"),
            ("STOREFRONT_PORT", "8080"),
            ("STOREFRONT_STORAGE_TIMEOUT_MS", "250"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.storage_timeout, Duration::from_millis(250));
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }
}
