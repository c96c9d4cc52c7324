//! Domain models for the inventory application.
//!
//! These are validated domain values, separate from database row types.

pub mod item;
pub mod session;
pub mod user;

pub use item::{InsertOutcome, Item, UpdateOutcome};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
