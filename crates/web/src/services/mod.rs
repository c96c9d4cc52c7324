//! Business logic services.
//!
//! - `auth` - Registration and password login

pub mod auth;
