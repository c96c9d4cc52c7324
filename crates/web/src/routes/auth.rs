//! Authentication route handlers.
//!
//! Handles login, logout and registration against the local user store.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{self, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::flash::{self, Level, Notice};
use crate::forms::{FieldErrors, LoginForm, RegisterForm};
use crate::middleware::{OptionalAuth, clear_current_user, remember_me_expiry, set_current_user};
use crate::models::CurrentUser;
use crate::redirect::safe_next;
use crate::routes::items::STORAGE_FAILED_MESSAGE;
use crate::services::auth::AuthError;
use crate::state::AppState;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";
pub const REGISTERED_MESSAGE: &str = "You can now login";
pub const LOGGED_OUT_MESSAGE: &str = "You have been logged out";
pub const USERNAME_TAKEN_MESSAGE: &str = "That username is already taken.";

// =============================================================================
// Query Types
// =============================================================================

/// Post-login target carried through the login page.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

impl NextQuery {
    /// `/login`, preserving `next` when present.
    fn login_url(&self) -> String {
        self.next.as_deref().map_or_else(
            || "/login".to_string(),
            crate::middleware::auth::login_url,
        )
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub notices: Vec<Notice>,
    pub next: Option<String>,
    pub username: String,
    pub errors: FieldErrors,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub notices: Vec<Notice>,
    pub form: RegisterForm,
    pub errors: FieldErrors,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Query(query): Query<NextQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        user,
        notices: flash::take(&session).await,
        next: query.next,
        username: String::new(),
        errors: FieldErrors::default(),
    }
}

/// Handle login form submission.
///
/// On success the session id is cycled, the user is stored in the session and
/// the browser is sent to `next` if it is a relative path, otherwise to `/`.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Response {
    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            return LoginTemplate {
                user: None,
                notices: flash::take(&session).await,
                next: query.next,
                username: form.username,
                errors,
            }
            .into_response();
        }
    };

    let user = match state.auth().login(&credentials).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Login failed: invalid credentials");
            flash::push(&session, Level::Error, INVALID_CREDENTIALS_MESSAGE).await;
            return Redirect::to(&query.login_url()).into_response();
        }
        Err(e) => {
            error::report(&e);
            flash::push(&session, Level::Error, STORAGE_FAILED_MESSAGE).await;
            return Redirect::to(&query.login_url()).into_response();
        }
    };

    // Fresh id on privilege change
    if let Err(e) = session.cycle_id().await {
        error::report(&e);
        flash::push(&session, Level::Error, STORAGE_FAILED_MESSAGE).await;
        return Redirect::to(&query.login_url()).into_response();
    }
    if credentials.remember_me {
        session.set_expiry(Some(remember_me_expiry()));
    }
    if let Err(e) = set_current_user(&session, &CurrentUser::from(&user)).await {
        error::report(&e);
        flash::push(&session, Level::Error, STORAGE_FAILED_MESSAGE).await;
        return Redirect::to(&query.login_url()).into_response();
    }

    set_sentry_user(&user.id, Some(user.username.as_str()));
    tracing::info!(user_id = %user.id, "User logged in");

    Redirect::to(safe_next(query.next.as_deref())).into_response()
}

/// End the session.
///
/// Anonymous visitors are sent to the login page without a `next`, so a
/// later login never lands back on `/logout`.
#[instrument(skip_all)]
pub async fn logout(OptionalAuth(user): OptionalAuth, session: Session) -> Response {
    let Some(user) = user else {
        return Redirect::to("/login").into_response();
    };

    if let Err(e) = clear_current_user(&session).await {
        tracing::warn!(error = %e, "Failed to clear session user");
    }
    if let Err(e) = session.flush().await {
        tracing::warn!(error = %e, "Failed to delete session");
    }

    clear_sentry_user();
    tracing::info!(user_id = %user.id, "User logged out");

    flash::push(&session, Level::Info, LOGGED_OUT_MESSAGE).await;
    Redirect::to("/login").into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> impl IntoResponse {
    RegisterTemplate {
        user,
        notices: flash::take(&session).await,
        form: RegisterForm::default(),
        errors: FieldErrors::default(),
    }
}

/// Handle registration form submission.
///
/// Invalid input or a taken username re-renders the form; success sends the
/// user to the login page.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let rerender = |form: RegisterForm, errors: FieldErrors, notices: Vec<Notice>| {
        // Never echo passwords back into the page.
        let form = RegisterForm {
            password: String::new(),
            password_confirm: String::new(),
            ..form
        };
        RegisterTemplate {
            user: user.clone(),
            notices,
            form,
            errors,
        }
        .into_response()
    };

    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => return rerender(form, errors, flash::take(&session).await),
    };

    match state.auth().register(&registration).await {
        Ok(user_id) => {
            tracing::info!(%user_id, username = %registration.username, "User registered");
            flash::push(&session, Level::Success, REGISTERED_MESSAGE).await;
            Redirect::to("/login").into_response()
        }
        Err(AuthError::UserAlreadyExists) => {
            tracing::warn!(username = %registration.username, "Registration failed: username taken");
            let mut errors = FieldErrors::default();
            errors.add("username", USERNAME_TAKEN_MESSAGE);
            rerender(form, errors, flash::take(&session).await)
        }
        Err(e) => {
            error::report(&e);
            flash::push(&session, Level::Error, STORAGE_FAILED_MESSAGE).await;
            Redirect::to("/register").into_response()
        }
    }
}
