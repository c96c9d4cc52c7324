//! Inventory item types and the outcomes of item mutations.

use serde::{Deserialize, Serialize};

use stockroom_core::{ItemName, Price};

/// An inventory item, keyed by its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique natural key.
    pub item_name: ItemName,
    /// Free-form description; may be empty.
    pub description: String,
    /// Non-negative price.
    pub price: Price,
}

impl Item {
    /// Maximum description length, in characters.
    pub const MAX_DESCRIPTION_LENGTH: usize = 500;

    #[must_use]
    pub fn new(item_name: ItemName, description: impl Into<String>, price: Price) -> Self {
        Self {
            item_name,
            description: description.into(),
            price,
        }
    }
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The item was written.
    Inserted,
    /// An item with the same name already exists; nothing was written.
    Duplicate,
}

impl InsertOutcome {
    /// `true` if the store was modified.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Result of an update-by-old-name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// All fields were rewritten.
    Updated,
    /// No item carries the old name; nothing was written.
    NotFound,
    /// The new name belongs to a different item; nothing was written.
    Conflict,
}

impl UpdateOutcome {
    /// `true` if the store was modified.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Updated)
    }
}
