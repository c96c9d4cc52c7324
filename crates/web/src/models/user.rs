//! User domain types.

use std::fmt;

use chrono::{DateTime, Utc};

use stockroom_core::{PhoneNumber, UserId, Username};

/// A registered user (domain type).
///
/// Implements `Debug` manually so the password hash never reaches logs.
#[derive(Clone)]
pub struct User {
    /// Store-assigned user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: Username,
    /// Name shown in the page header.
    pub display_name: String,
    /// Argon2 PHC string; opaque to everything but the auth service.
    pub password_hash: String,
    /// Contact phone number.
    pub phone: PhoneNumber,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("password_hash", &"[REDACTED]")
            .field("phone", &self.phone)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A user about to be created; the store assigns the ID.
#[derive(Clone)]
pub struct NewUser {
    pub username: Username,
    pub display_name: String,
    pub password_hash: String,
    pub phone: PhoneNumber,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("password_hash", &"[REDACTED]")
            .field("phone", &self.phone)
            .finish()
    }
}
