//! Authentication extractors.
//!
//! Provides extractors for requiring a logged-in user in route handlers.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::error::AppError;
use crate::flash::{self, Level};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Notice shown after an anonymous request is bounced to the login page.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";

/// Extractor that requires a logged-in user.
///
/// The session identity is re-checked against the user store on every
/// request, so a deleted account stops working immediately. Anonymous
/// browser requests are redirected to `/login?next=<path>`; JSON requests
/// get `401 {"error":"unauthorized"}`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests), preserving the target.
    RedirectToLogin { next: String },
    /// Unauthorized response (for JSON requests).
    Unauthorized,
    /// The user store could not be reached.
    Storage(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response(),
            Self::Storage(err) => err.into_response(),
        }
    }
}

/// `/login` with the original target in `next`.
#[must_use]
pub fn login_url(next: &str) -> String {
    format!("/login?next={}", urlencoding::encode(next))
}

fn wants_json(headers: &HeaderMap) -> bool {
    let is_json = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"))
    };
    is_json(header::CONTENT_TYPE) || is_json(header::ACCEPT)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let current: Option<CurrentUser> = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();

        if let Some(current) = current {
            let user = state
                .users()
                .get_by_id(current.id)
                .await
                .map_err(|e| AuthRejection::Storage(e.into()))?;

            if let Some(user) = user {
                return Ok(Self(CurrentUser::from(&user)));
            }

            // The account behind this session no longer exists.
            if let Err(e) = clear_current_user(&session).await {
                tracing::warn!(error = %e, "Failed to clear stale session user");
            }
        }

        if wants_json(&parts.headers) {
            return Err(AuthRejection::Unauthorized);
        }

        flash::push(&session, Level::Info, LOGIN_REQUIRED_MESSAGE).await;
        let next = parts
            .uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), ToString::to_string);
        Err(AuthRejection::RedirectToLogin { next })
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not
/// logged in, and it trusts the session without a store lookup.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_login_url_encodes_target() {
        assert_eq!(login_url("/"), "/login?next=%2F");
        assert_eq!(login_url("/?a=1&b=2"), "/login?next=%2F%3Fa%3D1%26b%3D2");
    }

    #[test]
    fn test_wants_json() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(wants_json(&headers));
    }
}
