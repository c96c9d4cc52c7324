//! Integration tests for Stockroom.
//!
//! # Running Tests
//!
//! ```bash
//! # Store tests against a migrated database
//! STOCKROOM_DATABASE_URL=postgres://... cargo test -p stockroom-integration-tests -- --ignored
//!
//! # HTTP tests against a running server
//! STOCKROOM_BASE_URL=http://localhost:3000 cargo test -p stockroom-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `postgres_stores` - `PostgreSQL` store adapters
//! - `http_flow` - Login, item add and update over HTTP

use secrecy::SecretString;
use uuid::Uuid;

/// Base URL of a running server (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOCKROOM_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Connection string for a migrated test database.
///
/// # Panics
///
/// Panics if neither `STOCKROOM_DATABASE_URL` nor `DATABASE_URL` is set.
#[must_use]
#[allow(clippy::expect_used)]
pub fn database_url() -> SecretString {
    std::env::var("STOCKROOM_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .expect("STOCKROOM_DATABASE_URL or DATABASE_URL must be set")
}

/// A name no other test run will collide with.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", suffix.get(..12).unwrap_or(&suffix))
}
