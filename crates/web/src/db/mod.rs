//! Storage for users and items.
//!
//! # Database: `stockroom`
//!
//! ## Tables
//!
//! - `stockroom.user` - Registered users (`username` UNIQUE)
//! - `stockroom.item` - Inventory items (`item_name` PRIMARY KEY)
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Ports and adapters
//!
//! Handlers talk to [`UserStore`] and [`ItemStore`]. Two adapters exist:
//! the `PostgreSQL` stores in [`users`] and [`items`], where every mutation is
//! a single statement and uniqueness is enforced by the table constraints,
//! and the in-memory stores in [`memory`] used by the `testing` profile.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p stockroom-cli -- migrate
//! ```

pub mod items;
pub mod memory;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use stockroom_core::{ItemName, UserId, Username};

use crate::models::{InsertOutcome, Item, NewUser, UpdateOutcome, User};

pub use items::PgItemStore;
pub use memory::{MemoryItemStore, MemoryUserStore};
pub use users::PgUserStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx (connectivity, unexpected constraint errors).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistence port for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user and return its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn create(&self, user: &NewUser) -> Result<UserId, RepositoryError>;

    /// Look up a user by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up a user by username.
    async fn get_by_username(&self, username: &Username)
    -> Result<Option<User>, RepositoryError>;
}

/// Persistence port for inventory items.
///
/// Expected outcomes (duplicate name, missing item, rename collision) are
/// returned as values; only unexpected storage failures are errors.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All items in insertion order.
    async fn list_all(&self) -> Result<Vec<Item>, RepositoryError>;

    /// Insert `item` unless an item with the same name exists.
    async fn insert_if_absent(&self, item: &Item) -> Result<InsertOutcome, RepositoryError>;

    /// Rewrite the item currently named `old_name` with the fields of `item`.
    async fn update_by_old_name(
        &self,
        item: &Item,
        old_name: &ItemName,
    ) -> Result<UpdateOutcome, RepositoryError>;

    /// Check that the backing storage is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// The pair of stores handed to the application state.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub items: Arc<dyn ItemStore>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            items: Arc::new(PgItemStore::new(pool)),
        }
    }

    /// Empty in-memory stores.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::default()),
            items: Arc::new(MemoryItemStore::default()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded migrations in `crates/web/migrations/`.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Whether a sqlx error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
