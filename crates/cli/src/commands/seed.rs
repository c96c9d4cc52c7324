//! Seed inventory items from a YAML file.
//!
//! The file is a list of items:
//!
//! ```yaml
//! - item_name: Hammer
//!   description: Claw hammer
//!   price: 12.50
//! - item_name: Nails
//!   price: "3.99"
//! ```
//!
//! Every entry is validated like the add-item form before anything is
//! written; existing names are skipped, never overwritten.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use stockroom_web::db::{self, ItemStore, PgItemStore};
use stockroom_web::forms::ItemForm;
use stockroom_web::models::{InsertOutcome, Item};

use super::database_url;

/// A price written either as a YAML number or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedPrice {
    Number(f64),
    Text(String),
}

/// One entry of the seed file.
#[derive(Debug, Deserialize)]
struct SeedItem {
    item_name: String,
    #[serde(default)]
    description: String,
    price: SeedPrice,
}

impl SeedItem {
    fn into_form(self) -> ItemForm {
        ItemForm {
            item_name: self.item_name,
            description: self.description,
            price: match self.price {
                SeedPrice::Number(n) => n.to_string(),
                SeedPrice::Text(s) => s,
            },
        }
    }
}

/// Parse and validate a seed file's contents.
fn parse_items(content: &str) -> Result<Vec<Item>, Box<dyn std::error::Error>> {
    let entries: Vec<SeedItem> = serde_yaml::from_str(content)?;

    let mut items = Vec::with_capacity(entries.len());
    let mut invalid = 0_usize;
    for (index, entry) in entries.into_iter().enumerate() {
        match entry.into_form().validate() {
            Ok(item) => items.push(item),
            Err(errors) => {
                invalid += 1;
                for field in errors.fields() {
                    for message in errors.get(field) {
                        error!("  - entry {}: {field}: {message}", index + 1);
                    }
                }
            }
        }
    }

    if invalid > 0 {
        return Err(format!("{invalid} invalid entries found").into());
    }
    Ok(items)
}

/// Seed items from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or database operations fail.
pub async fn items(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading items from file");
    let content = tokio::fs::read_to_string(path).await?;
    let items = parse_items(&content)?;
    info!(items = items.len(), "Parsed and validated items");

    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");
    let store = PgItemStore::new(pool);

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;
    for item in &items {
        match store.insert_if_absent(item).await? {
            InsertOutcome::Inserted => inserted += 1,
            InsertOutcome::Duplicate => skipped += 1,
        }
    }

    info!("Seeding complete!");
    info!("  Items inserted: {inserted}");
    info!("  Items skipped (already exist): {skipped}");
    Ok(())
}
