//! In-memory stores for the `testing` profile and the test suites.
//!
//! Each store keeps its rows behind one `RwLock`; a mutation takes the write
//! lock for its whole check-and-write, which gives the same guarantees the
//! `PostgreSQL` constraints give the real stores.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use stockroom_core::{ItemName, UserId, Username};

use super::{ItemStore, RepositoryError, UserStore};
use crate::models::{InsertOutcome, Item, NewUser, UpdateOutcome, User};

/// Users kept in a vector, IDs assigned from 1.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &NewUser) -> Result<UserId, RepositoryError> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.username == user.username) {
            return Err(RepositoryError::Conflict(
                "username already exists".to_owned(),
            ));
        }

        let next = i32::try_from(users.len() + 1)
            .map_err(|_| RepositoryError::DataCorruption("user id overflow".to_owned()))?;
        let id = UserId::new(next);

        users.push(User {
            id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            password_hash: user.password_hash.clone(),
            phone: user.phone.clone(),
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| &u.username == username).cloned())
    }
}

/// Items kept in insertion order.
#[derive(Default)]
pub struct MemoryItemStore {
    items: RwLock<Vec<Item>>,
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn list_all(&self) -> Result<Vec<Item>, RepositoryError> {
        Ok(self.items.read().await.clone())
    }

    async fn insert_if_absent(&self, item: &Item) -> Result<InsertOutcome, RepositoryError> {
        let mut items = self.items.write().await;

        if items.iter().any(|i| i.item_name == item.item_name) {
            return Ok(InsertOutcome::Duplicate);
        }

        items.push(item.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update_by_old_name(
        &self,
        item: &Item,
        old_name: &ItemName,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let mut items = self.items.write().await;

        let Some(index) = items.iter().position(|i| &i.item_name == old_name) else {
            return Ok(UpdateOutcome::NotFound);
        };

        let taken = items
            .iter()
            .enumerate()
            .any(|(i, other)| i != index && other.item_name == item.item_name);
        if taken {
            return Ok(UpdateOutcome::Conflict);
        }

        if let Some(slot) = items.get_mut(index) {
            *slot = item.clone();
        }
        Ok(UpdateOutcome::Updated)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
