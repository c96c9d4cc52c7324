//! Session middleware configuration.
//!
//! Cookies are signed with a key derived from `STOCKROOM_SESSION_SECRET`;
//! the store is chosen by the caller (`PostgreSQL` in deployment, memory in
//! the `testing` profile and router tests).

use secrecy::ExposeSecret;
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{Key, SameSite, time::Duration},
    service::SignedCookie,
};

use crate::config::StockroomConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "stockroom_session";

/// Inactivity window for "remember me" sessions (30 days).
pub const REMEMBER_ME_DAYS: i64 = 30;

/// Expiry applied on login when the user ticks "remember me".
#[must_use]
pub const fn remember_me_expiry() -> Expiry {
    Expiry::OnInactivity(Duration::days(REMEMBER_ME_DAYS))
}

/// Cookie signing key for the configured secret.
///
/// Falls back to a random key (sessions do not survive a restart) when no
/// secret is configured or it is too short to derive a key from.
#[must_use]
pub fn signing_key(config: &StockroomConfig) -> Key {
    config
        .session_secret
        .as_ref()
        .and_then(|secret| Key::try_from(secret.expose_secret().as_bytes()).ok())
        .unwrap_or_else(|| {
            tracing::warn!("No usable session secret; generating an ephemeral signing key");
            Key::generate()
        })
}

/// Create the session layer over `store`.
///
/// Sessions end with the browser session unless the login handler sets
/// [`remember_me_expiry`].
#[must_use]
pub fn create_session_layer<S: SessionStore + Clone>(
    store: S,
    config: &StockroomConfig,
    key: Key,
) -> SessionManagerLayer<S, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key)
}
