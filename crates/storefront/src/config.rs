//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 64 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_ENV` - `development` or `production` (default: development)
//! - `PRICING_OVERSIZE_SURCHARGE` - Per-unit oversize surcharge in rupees (default: 200)
//! - `PRICING_COD_FEE` - Cash-on-delivery fee in rupees (default: 90)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use atelier_core::Money;
use atelier_core::pricing::PricingConfig;

/// Cookie signing keys are 64 bytes.
const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected development or production, got '{other}'")),
        }
    }
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
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Deployment environment; production hides error detail
    pub environment: Environment,
    /// Surcharge, COD fee and measurement thresholds
    pub pricing: PricingConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let session_secret = load_secret("STOREFRONT_SESSION_SECRET")?;
        let environment = parse_env("STOREFRONT_ENV", "development")?;

        let defaults = PricingConfig::default();
        let pricing = PricingConfig {
            oversize_surcharge: get_money("PRICING_OVERSIZE_SURCHARGE", defaults.oversize_surcharge)?,
            cod_fee: get_money("PRICING_COD_FEE", defaults.cod_fee)?,
            thresholds: defaults.thresholds,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            environment,
            pricing,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether error responses must hide internal detail.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn uses_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Database URL from `primary_key`, else the generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    [primary_key, "DATABASE_URL"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a non-negative rupee amount.
fn get_money(key: &str, default: Money) -> Result<Money, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    parse_money(&raw).map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
}

fn parse_money(raw: &str) -> Result<Money, String> {
    let amount = Decimal::from_str(raw.trim()).map_err(|e| e.to_string())?;
    if amount < Decimal::ZERO {
        return Err("amount cannot be negative".to_owned());
    }
    Ok(Money::new(amount))
}

/// Load `key` and refuse secrets that are short, look like a template value
/// or are too repetitive to be random.
fn load_secret(key: &str) -> Result<SecretString, ConfigError> {
    let secret = SecretString::from(get_required_env(key)?);
    match weak_secret_reason(secret.expose_secret()) {
        Some(reason) => Err(ConfigError::InsecureSecret(key.to_string(), reason)),
        None => Ok(secret),
    }
}

fn weak_secret_reason(secret: &str) -> Option<String> {
    let length = secret.chars().count();
    if length < MIN_SESSION_SECRET_LENGTH {
        return Some(format!(
            "must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {length})"
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Some(format!("looks like a placeholder ('{pattern}')"));
    }

    let bits = bits_per_char(secret);
    (bits < MIN_ENTROPY_BITS_PER_CHAR).then(|| {
        format!("only {bits:.2} bits of entropy per character, need {MIN_ENTROPY_BITS_PER_CHAR:.1}")
    })
}

/// Shannon entropy of the character distribution.
fn bits_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let total = counts.values().sum::<u32>();
    if total == 0 {
        return 0.0;
    }

    counts
        .values()
        .map(|&n| f64::from(n) / f64::from(total))
        .map(|share| -share * share.log2())
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RANDOM_64: &str = "k7Qp2vXz9LmN4rTw8YbHc3JdF6GsA1UeR5tWq8ZnB2xVc4MkJ7hLp9DfG3sY6aE1";

    fn config(environment: Environment) -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(64)),
            environment,
            pricing: PricingConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_bits_per_char() {
        assert!(bits_per_char("").abs() < f64::EPSILON);
        assert!((bits_per_char("abab") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weak_secrets_are_refused() {
        assert!(weak_secret_reason("short").unwrap().contains("at least 64"));
        assert!(
            weak_secret_reason("replace-me-with-a-long-random-value-0001")
                .unwrap()
                .contains("placeholder")
        );
        assert!(weak_secret_reason(&"ab".repeat(20)).unwrap().contains("entropy"));
    }

    #[test]
    fn test_random_secret_is_accepted() {
        assert_eq!(weak_secret_reason(RANDOM_64), None);
    }

    #[test]
    fn test_secret_length_boundary() {
        let reason = weak_secret_reason(&RANDOM_64[..63]).unwrap();
        assert!(reason.contains("got 63"));
        assert_eq!(weak_secret_reason(RANDOM_64), None);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("Production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money(" 250 ").unwrap(), Money::from_rupees(250));
        assert!(parse_money("-1").is_err());
        assert!(parse_money("lots").is_err());
    }

    #[test]
    fn test_socket_addr_and_flags() {
        let config = config(Environment::Production);
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(config.is_production());
        assert!(!config.uses_https());
    }
}
