//! `PostgreSQL` store adapter tests.
//!
//! These tests require a migrated database:
//! `stockroom-cli migrate` with `STOCKROOM_DATABASE_URL` set.

use std::sync::Arc;

use stockroom_core::{ItemName, PhoneNumber, Price, Username};
use stockroom_integration_tests::{database_url, unique_name};
use stockroom_web::db::{self, ItemStore, PgItemStore, PgUserStore, RepositoryError, UserStore};
use stockroom_web::models::{InsertOutcome, Item, NewUser, UpdateOutcome};
use stockroom_web::services::auth::{hash_password, verify_password};

async fn pool() -> sqlx::PgPool {
    db::create_pool(&database_url())
        .await
        .expect("Failed to connect to test database")
}

fn item(name: &str, description: &str, price: &str) -> Item {
    Item::new(
        ItemName::parse(name).expect("valid name"),
        description,
        Price::parse(price).expect("valid price"),
    )
}

fn find<'a>(items: &'a [Item], name: &str) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|i| i.item_name.as_str() == name)
        .collect()
}

// ============================================================================
// Items
// ============================================================================

#[tokio::test]
#[ignore = "Requires a migrated PostgreSQL database"]
async fn test_insert_then_list() {
    let store = PgItemStore::new(pool().await);
    let name = unique_name("item");

    let outcome = store
        .insert_if_absent(&item(&name, "d", "1.0"))
        .await
        .expect("insert");
    assert_eq!(outcome, InsertOutcome::Inserted);

    let items = store.list_all().await.expect("list");
    let matches = find(&items, &name);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].description, "d");
    assert_eq!(matches[0].price, Price::parse("1").expect("price"));
}

#[tokio::test]
#[ignore = "Requires a migrated PostgreSQL database"]
async fn test_concurrent_inserts_apply_once() {
    let store = Arc::new(PgItemStore::new(pool().await));
    let name = unique_name("race");

    let mut handles = Vec::new();
    for n in 0..8 {
        let store = Arc::clone(&store);
        let item = item(&name, &n.to_string(), "2");
        handles.push(tokio::spawn(async move {
            store.insert_if_absent(&item).await.expect("insert")
        }));
    }

    let mut inserted = 0;
    for handle in handles {
        if handle.await.expect("join").is_applied() {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert_eq!(find(&store.list_all().await.expect("list"), &name).len(), 1);
}

#[tokio::test]
#[ignore = "Requires a migrated PostgreSQL database"]
async fn test_update_outcomes() {
    let store = PgItemStore::new(pool().await);
    let a = unique_name("a");
    let b = unique_name("b");
    let c = unique_name("c");
    store.insert_if_absent(&item(&a, "one", "1")).await.expect("insert a");
    store.insert_if_absent(&item(&b, "two", "2")).await.expect("insert b");

    let missing = ItemName::parse(&unique_name("missing")).expect("name");
    let outcome = store
        .update_by_old_name(&item(&c, "x", "9"), &missing)
        .await
        .expect("update missing");
    assert_eq!(outcome, UpdateOutcome::NotFound);

    let a_name = ItemName::parse(&a).expect("name");
    let outcome = store
        .update_by_old_name(&item(&b, "merged", "3"), &a_name)
        .await
        .expect("update conflict");
    assert_eq!(outcome, UpdateOutcome::Conflict);

    let items = store.list_all().await.expect("list");
    assert_eq!(find(&items, &a)[0].description, "one");
    assert_eq!(find(&items, &b)[0].description, "two");

    let outcome = store
        .update_by_old_name(&item(&c, "three", "3.50"), &a_name)
        .await
        .expect("rename");
    assert_eq!(outcome, UpdateOutcome::Updated);

    let items = store.list_all().await.expect("list");
    assert!(find(&items, &a).is_empty());
    assert_eq!(find(&items, &c)[0].description, "three");
}

#[tokio::test]
#[ignore = "Requires a migrated PostgreSQL database"]
async fn test_ping() {
    let store = PgItemStore::new(pool().await);
    store.ping().await.expect("ping");
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
#[ignore = "Requires a migrated PostgreSQL database"]
async fn test_create_user_once_and_verify_hash() {
    let store = PgUserStore::new(pool().await);
    let username = Username::parse(&unique_name("user")).expect("username");
    let password_hash = hash_password("correct horse").expect("hash");

    let new_user = NewUser {
        username: username.clone(),
        display_name: "Integration".to_string(),
        password_hash,
        phone: PhoneNumber::parse("5550100").expect("phone"),
    };

    let id = store.create(&new_user).await.expect("create");
    let err = store.create(&new_user).await.expect_err("duplicate");
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let user = store
        .get_by_username(&username)
        .await
        .expect("lookup")
        .expect("user exists");
    assert_eq!(user.id, id);
    assert_ne!(user.password_hash, "correct horse");
    assert!(verify_password("correct horse", &user.password_hash).is_ok());

    let by_id = store.get_by_id(id).await.expect("lookup").expect("user exists");
    assert_eq!(by_id.username, username);
}
