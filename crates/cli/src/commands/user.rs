//! User management commands.
//!
//! The password is read from stdin so it never appears in shell history or
//! the process list. It goes through the same validation and hashing as the
//! web registration form.

use std::io::BufRead;

use stockroom_web::db::{self, PgUserStore};
use stockroom_web::forms::RegisterForm;
use stockroom_web::services::auth::{AuthError, AuthService};
use stockroom_core::UserId;

use super::database_url;

/// Create a new user.
///
/// # Errors
///
/// Returns an error if validation fails, the username is taken, or the
/// database is unreachable.
pub async fn create(
    username: &str,
    name: &str,
    phone: &str,
) -> Result<UserId, Box<dyn std::error::Error>> {
    let password = read_password()?;

    let form = RegisterForm {
        username: username.to_owned(),
        name: name.to_owned(),
        password: password.clone(),
        password_confirm: password,
        phonenumber: phone.to_owned(),
    };
    let registration = form.validate().map_err(|errors| {
        for field in errors.fields() {
            for message in errors.get(field) {
                tracing::error!("  - {field}: {message}");
            }
        }
        "invalid user details"
    })?;

    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;
    let users = PgUserStore::new(pool);

    tracing::info!("Creating user: {}", registration.username);
    let user_id = match AuthService::new(&users).register(&registration).await {
        Ok(id) => id,
        Err(AuthError::UserAlreadyExists) => {
            return Err(format!("User already exists: {}", registration.username).into());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "User created successfully! ID: {}, Username: {}",
        user_id,
        registration.username
    );
    Ok(user_id)
}

/// Read one line from stdin, without the trailing newline.
fn read_password() -> std::io::Result<String> {
    tracing::info!("Reading password from stdin...");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
