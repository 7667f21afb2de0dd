//! Session middleware configuration.
//!
//! `PostgreSQL`-backed sessions using tower-sessions, with cookies signed by
//! a key built from `STOREFRONT_SESSION_SECRET`. The session table is
//! created by the `tower_sessions` migration.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::{ConfigError, StorefrontConfig};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "atelier_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Session layer type used by the storefront router.
pub type StorefrontSessionLayer = SessionManagerLayer<PostgresStore, SignedCookie>;

/// Create the session layer with `PostgreSQL` store.
///
/// Cookies are marked `Secure` when the base URL is HTTPS.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` if the session secret is shorter
/// than the 64 bytes a signing key needs.
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> Result<StorefrontSessionLayer, ConfigError> {
    let key = Key::try_from(config.session_secret.expose_secret().as_bytes()).map_err(|e| {
        ConfigError::InsecureSecret("STOREFRONT_SESSION_SECRET".to_string(), e.to_string())
    })?;

    let store = PostgresStore::new(pool.clone());

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.uses_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
