//! Stockroom Core - Shared types library.
//!
//! This crate provides the validated domain types used by every Stockroom
//! component:
//! - `web` - The inventory web application
//! - `cli` - Command-line tools for migrations, users and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! Every type here is constructed through a `parse` function, so a value that
//! exists has already passed validation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, usernames, item names, prices and phone numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
