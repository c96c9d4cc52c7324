//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                 - Item list and add form (login required)
//! POST /                 - Add item (login required)
//! POST /items/update     - Rename/update an item, JSON (login required)
//!
//! # Auth
//! GET  /login            - Login page (keeps ?next=)
//! POST /login            - Login action (rate limited)
//! GET  /register         - Register page
//! POST /register         - Register action (rate limited)
//! GET  /logout           - Logout action (also POST)
//!
//! # Health
//! GET  /health           - Liveness
//! GET  /health/ready     - Readiness (store ping)
//! ```

pub mod auth;
pub mod health;
pub mod items;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the item routes router.
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(items::index).post(items::add))
        .route("/items/update", post(items::update))
}

/// Create the auth routes router.
///
/// When `rate_limit` is set, credential submissions are limited per client IP.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let credentials = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register));
    let credentials = if rate_limit {
        credentials.layer(auth_rate_limiter())
    } else {
        credentials
    };

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", get(auth::logout).post(auth::logout))
        .merge(credentials)
}

/// Create all routes.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(item_routes())
        .merge(auth_routes(rate_limit))
}
