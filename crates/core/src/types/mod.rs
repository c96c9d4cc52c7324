//! Core types for Stockroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod item_name;
pub mod phone;
pub mod price;
pub mod username;

pub use id::*;
pub use item_name::{ItemName, ItemNameError};
pub use phone::{PhoneNumber, PhoneNumberError};
pub use price::{Price, PriceError};
pub use username::{Username, UsernameError};
