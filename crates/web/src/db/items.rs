//! `PostgreSQL` item repository.
//!
//! Each mutation is one statement. The primary key on `item_name` is what
//! keeps names unique under concurrent requests; nothing here checks before
//! writing.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use stockroom_core::{ItemName, Price};

use super::{ItemStore, RepositoryError, is_unique_violation};
use crate::models::{InsertOutcome, Item, UpdateOutcome};

/// Row shape of `stockroom.item`.
#[derive(sqlx::FromRow)]
struct ItemRow {
    item_name: String,
    description: String,
    price: Decimal,
}

impl TryFrom<ItemRow> for Item {
    type Error = RepositoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let item_name = ItemName::parse(&row.item_name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid item name in database: {e}"))
        })?;
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;

        Ok(Self::new(item_name, row.description, price))
    }
}

/// Item store backed by the `stockroom.item` table.
#[derive(Clone)]
pub struct PgItemStore {
    pool: PgPool,
}

impl PgItemStore {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn list_all(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT item_name, description, price
            FROM stockroom.item
            ORDER BY seq ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Item::try_from).collect()
    }

    async fn insert_if_absent(&self, item: &Item) -> Result<InsertOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO stockroom.item (item_name, description, price)
            VALUES ($1, $2, $3)
            ON CONFLICT (item_name) DO NOTHING
            ",
        )
        .bind(item.item_name.as_str())
        .bind(&item.description)
        .bind(item.price.amount())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::Duplicate);
        }

        Ok(InsertOutcome::Inserted)
    }

    async fn update_by_old_name(
        &self,
        item: &Item,
        old_name: &ItemName,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE stockroom.item
            SET item_name = $1, description = $2, price = $3
            WHERE item_name = $4
            ",
        )
        .bind(item.item_name.as_str())
        .bind(&item.description)
        .bind(item.price.amount())
        .bind(old_name.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(UpdateOutcome::NotFound),
            Ok(_) => Ok(UpdateOutcome::Updated),
            Err(e) if is_unique_violation(&e) => Ok(UpdateOutcome::Conflict),
            Err(e) => Err(RepositoryError::Database(e)),
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
