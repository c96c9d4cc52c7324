//! `PostgreSQL` user repository.
//!
//! Queries use the runtime-checked `sqlx::query_as` API so the crate builds
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use stockroom_core::{PhoneNumber, UserId, Username};

use super::{RepositoryError, UserStore, is_unique_violation};
use crate::models::{NewUser, User};

/// Row shape of `stockroom.user`.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    display_name: String,
    password_hash: String,
    phone: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let phone = PhoneNumber::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username,
            display_name: row.display_name,
            password_hash: row.password_hash,
            phone,
            created_at: row.created_at,
        })
    }
}

/// User store backed by the `stockroom.user` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &NewUser) -> Result<UserId, RepositoryError> {
        let (id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO stockroom.user (username, display_name, password_hash, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(user.username.as_str())
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.phone.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return RepositoryError::Conflict("username already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(UserId::new(id))
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, username, display_name, password_hash, phone, created_at
            FROM stockroom.user
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, username, display_name, password_hash, phone, created_at
            FROM stockroom.user
            WHERE username = $1
            ",
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}
