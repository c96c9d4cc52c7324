//! Authentication service.
//!
//! Password registration and login against a [`UserStore`].

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::ExposeSecret;

use stockroom_core::{UserId, Username};

use crate::db::{RepositoryError, UserStore};
use crate::forms::{Credentials, Registration};
use crate::models::{NewUser, User};

/// Hash verified when the username is unknown, so a miss costs the same
/// Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("stockroom-dummy-password").ok());

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the username is taken.
    pub async fn register(&self, registration: &Registration) -> Result<UserId, AuthError> {
        let password_hash = hash_password(registration.password.expose_secret())?;

        let new_user = NewUser {
            username: registration.username.clone(),
            display_name: registration.display_name.clone(),
            password_hash,
            phone: registration.phone.clone(),
        };

        self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
    }

    /// Login with username and password.
    ///
    /// Unknown usernames, malformed usernames and wrong passwords all yield
    /// the same error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let password = credentials.password.expose_secret();

        let user = match Username::parse(&credentials.username) {
            Ok(username) => self.users.get_by_username(&username).await?,
            Err(_) => None,
        };

        let Some(user) = user else {
            if let Some(hash) = DUMMY_HASH.as_deref() {
                // Result ignored: the login fails either way.
                let _ = verify_password(password, hash);
            }
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &user.password_hash)?;

        Ok(user)
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password does not match
/// or the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
