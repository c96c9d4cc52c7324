//! Router assembly.
//!
//! [`build_app`] wires routes, static files and the middleware stack around
//! an [`AppState`]. `main` adds the Sentry layers on top; router tests call it
//! directly with memory stores.

use axum::{Router, middleware::from_fn};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionStore, cookie::Key};
use tracing::Span;

use crate::middleware::{
    create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::routes;
use crate::state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the application router.
///
/// `store` backs the sessions and `key` signs the session cookie.
pub fn build_app<S>(state: AppState, store: S, key: Key) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(store, state.config(), key);
    let rate_limit = state.config().rate_limit_auth;

    Router::new()
        .merge(routes::routes(rate_limit))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use stockroom_core::{ItemName, UserId, Username};
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::StockroomConfig;
    use crate::db::{
        ItemStore, MemoryItemStore, MemoryUserStore, RepositoryError, Stores, UserStore,
    };
    use crate::forms::RegisterForm;
    use crate::models::{InsertOutcome, Item, NewUser, UpdateOutcome, User};

    const PASSWORD: &str = "correct horse";
    const STORAGE_FAILED: &str = "Something went wrong. Please try again.";

    fn unavailable() -> RepositoryError {
        RepositoryError::Database(sqlx::Error::PoolTimedOut)
    }

    /// Item store whose database is unreachable.
    struct UnavailableItems;

    #[async_trait]
    impl ItemStore for UnavailableItems {
        async fn list_all(&self) -> Result<Vec<Item>, RepositoryError> {
            Err(unavailable())
        }

        async fn insert_if_absent(&self, _: &Item) -> Result<InsertOutcome, RepositoryError> {
            Err(unavailable())
        }

        async fn update_by_old_name(
            &self,
            _: &Item,
            _: &ItemName,
        ) -> Result<UpdateOutcome, RepositoryError> {
            Err(unavailable())
        }

        async fn ping(&self) -> Result<(), RepositoryError> {
            Err(unavailable())
        }
    }

    /// User store whose database is unreachable.
    struct UnavailableUsers;

    #[async_trait]
    impl UserStore for UnavailableUsers {
        async fn create(&self, _: &NewUser) -> Result<UserId, RepositoryError> {
            Err(unavailable())
        }

        async fn get_by_id(&self, _: UserId) -> Result<Option<User>, RepositoryError> {
            Err(unavailable())
        }

        async fn get_by_username(&self, _: &Username) -> Result<Option<User>, RepositoryError> {
            Err(unavailable())
        }
    }

    /// A router plus the session cookie a browser would carry.
    struct Browser {
        app: Router,
        state: AppState,
        cookie: Option<String>,
    }

    impl Browser {
        fn new() -> Self {
            Self::with_stores(Stores::memory())
        }

        fn with_stores(stores: Stores) -> Self {
            let config = StockroomConfig::from_lookup(|key| {
                (key == "STOCKROOM_PROFILE").then(|| "testing".to_string())
            })
            .unwrap();
            let state = AppState::new(config, stores);
            let app = build_app(state.clone(), MemoryStore::default(), Key::generate());
            Self {
                app,
                state,
                cookie: None,
            }
        }

        async fn send(&mut self, mut request: Request<Body>) -> Response {
            if let Some(cookie) = &self.cookie {
                request
                    .headers_mut()
                    .insert(header::COOKIE, cookie.parse().unwrap());
            }
            let response = self.app.clone().oneshot(request).await.unwrap();
            if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
                let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
                self.cookie = Some(pair.to_string());
            }
            response
        }

        async fn get(&mut self, uri: &str) -> Response {
            self.send(Request::get(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post_form(&mut self, uri: &str, body: &str) -> Response {
            let request = Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(request).await
        }

        async fn post_json(&mut self, uri: &str, body: &Value) -> Response {
            let request = Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(request).await
        }

        async fn register(&self, username: &str) {
            let form = RegisterForm {
                username: username.to_string(),
                name: "Test User".to_string(),
                password: PASSWORD.to_string(),
                password_confirm: PASSWORD.to_string(),
                phonenumber: "91234567".to_string(),
            };
            self.state
                .auth()
                .register(&form.validate().unwrap())
                .await
                .unwrap();
        }

        async fn log_in(&mut self, username: &str) {
            self.register(username).await;
            let response = self
                .post_form("/login", &format!("username={username}&password=correct+horse"))
                .await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn update_body(old_name: &str, new_name: &str, price: Value) -> Value {
        json!({
            "oldItem": {"item_name": old_name, "description": "", "price": 0},
            "newItem": {"item_name": new_name, "description": "updated", "price": price},
        })
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let mut browser = Browser::new();

        let response = browser.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");

        let response = browser.get("/health/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_responses_carry_request_id_and_security_headers() {
        let mut browser = Browser::new();
        let response = browser.get("/health").await;

        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert!(response.headers().contains_key(header::CONTENT_SECURITY_POLICY));
    }

    #[tokio::test]
    async fn test_anonymous_page_request_redirects_to_login() {
        let mut browser = Browser::new();

        let response = browser.get("/").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?next=%2F");

        let page = body_text(browser.get("/login").await).await;
        assert!(page.contains("Please log in to access this page."));
    }

    #[tokio::test]
    async fn test_anonymous_json_request_is_unauthorized() {
        let mut browser = Browser::new();
        let response = browser
            .post_json("/items/update", &update_body("a", "b", json!(1)))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"error": "unauthorized"}));
    }

    #[tokio::test]
    async fn test_login_redirect_only_honours_relative_paths() {
        let mut browser = Browser::new();
        browser.register("alice").await;
        let body = "username=alice&password=correct+horse";

        let response = browser
            .post_form("/login?next=http%3A%2F%2Fevil.com", body)
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let response = browser.post_form("/login?next=%2Fitems", body).await;
        assert_eq!(location(&response), "/items");

        let response = browser.post_form("/login?next=%2F%2Fevil.com", body).await;
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_login_failures_show_the_same_message() {
        let mut browser = Browser::new();
        browser.register("alice").await;

        let mut pages = Vec::new();
        for body in [
            "username=alice&password=wrong+horse",
            "username=mallory&password=correct+horse",
        ] {
            let response = browser.post_form("/login?next=%2F", body).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/login?next=%2F");
            pages.push(body_text(browser.get("/login").await).await);
        }

        for page in &pages {
            assert!(page.contains("Invalid username or password"));
        }
        assert!(browser.get("/").await.status().is_redirection());
    }

    #[tokio::test]
    async fn test_login_with_missing_fields_rerenders() {
        let mut browser = Browser::new();
        let response = browser.post_form("/login", "username=alice").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("This field is required."));
    }

    #[tokio::test]
    async fn test_register_then_login_page_notice() {
        let mut browser = Browser::new();
        let form = "username=bob&name=Bob&password=correct+horse\
                    &password_confirm=correct+horse&phonenumber=%2B6591234567";

        let response = browser.post_form("/register", form).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert!(body_text(browser.get("/login").await).await.contains("You can now login"));

        let response = browser.post_form("/register", form).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("That username is already taken."));
        assert!(!page.contains(PASSWORD));
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let mut browser = Browser::new();
        let response = browser
            .post_form(
                "/register",
                "username=bob&name=Bob&password=short&password_confirm=other&phonenumber=12",
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("Passwords must match."));
        assert!(page.contains("Must be at least 8 characters."));
    }

    #[tokio::test]
    async fn test_add_item_then_duplicate() {
        let mut browser = Browser::new();
        browser.log_in("alice").await;

        let response = browser
            .post_form("/", "item_name=Hammer&description=Claw&price=12.50")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let page = body_text(browser.get("/").await).await;
        assert!(page.contains("Successfully added an item!"));
        assert!(page.contains("Hammer"));
        assert!(page.contains("12.50"));

        browser
            .post_form("/", "item_name=Hammer&description=Other&price=1")
            .await;
        let page = body_text(browser.get("/").await).await;
        assert!(page.contains("That item already exists! Try another one!"));

        let items = browser.state.items().list_all().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Claw");
    }

    #[tokio::test]
    async fn test_invalid_item_writes_nothing() {
        let mut browser = Browser::new();
        browser.log_in("alice").await;

        let response = browser
            .post_form("/", "item_name=&description=x&price=-1")
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("This field is required."));
        assert!(page.contains("Price cannot be negative."));

        assert!(browser.state.items().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_outcomes() {
        let mut browser = Browser::new();
        browser.log_in("alice").await;
        browser.post_form("/", "item_name=a&price=1").await;
        browser.post_form("/", "item_name=b&price=2").await;

        let response = browser
            .post_json("/items/update", &update_body("a", "c", json!("3.5")))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"updated": true}));

        let response = browser
            .post_json("/items/update", &update_body("missing", "d", json!(1)))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"updated": false, "reason": "not_found"})
        );

        let response = browser
            .post_json("/items/update", &update_body("c", "b", json!(1)))
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["reason"], "conflict");

        let response = browser
            .post_json("/items/update", &update_body("c", "", json!(-1)))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["reason"], "invalid");
        assert!(body["errors"]["newItem.item_name"].is_array());
        assert!(body["errors"]["newItem.price"].is_array());

        let names: Vec<String> = browser
            .state
            .items()
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.item_name.into_inner())
            .collect();
        assert_eq!(names, vec!["c".to_string(), "b".to_string()]);

        let page = body_text(browser.get("/").await).await;
        assert!(page.contains("Successfully updated an item!"));
        assert!(page.contains("Update failed!"));
    }

    #[tokio::test]
    async fn test_malformed_update_body_is_invalid() {
        let mut browser = Browser::new();
        browser.log_in("alice").await;

        let request = Request::post("/items/update")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = browser.send(request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["reason"], "invalid");
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let mut browser = Browser::new();
        browser.log_in("alice").await;
        assert_eq!(browser.get("/").await.status(), StatusCode::OK);

        let response = browser.get("/logout").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert!(
            body_text(browser.get("/login").await)
                .await
                .contains("You have been logged out")
        );

        assert_eq!(browser.get("/").await.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_anonymous_logout_does_not_carry_next() {
        let mut browser = Browser::new();

        let response = browser.get("/logout").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn test_remember_me_keeps_cookie_for_thirty_days() {
        let mut browser = Browser::new();
        browser.register("alice").await;

        let response = browser
            .post_form(
                "/login",
                "username=alice&password=correct+horse&remember_me=on",
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age=2592000"), "{cookie}");
    }

    #[tokio::test]
    async fn test_session_cookie_ends_with_browser_by_default() {
        let mut browser = Browser::new();
        browser.register("alice").await;

        let response = browser
            .post_form("/login", "username=alice&password=correct+horse")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(!cookie.contains("Max-Age"), "{cookie}");
        assert!(!cookie.contains("Expires"), "{cookie}");
    }

    #[tokio::test]
    async fn test_item_storage_failures() {
        let mut browser = Browser::with_stores(Stores {
            users: Arc::new(MemoryUserStore::default()),
            items: Arc::new(UnavailableItems),
        });
        browser.log_in("alice").await;

        let response = browser
            .post_form("/", "item_name=Hammer&description=Claw&price=12.50")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let response = browser.get("/").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Internal server error");

        let response = browser
            .post_json("/items/update", &update_body("a", "b", json!(1)))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"updated": false, "reason": "error"})
        );

        let page = body_text(browser.get("/login").await).await;
        assert!(page.contains(STORAGE_FAILED));

        let response = browser.get("/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_login_storage_failure_shows_generic_notice() {
        let mut browser = Browser::with_stores(Stores {
            users: Arc::new(UnavailableUsers),
            items: Arc::new(MemoryItemStore::default()),
        });

        let response = browser
            .post_form("/login?next=%2F", "username=alice&password=correct+horse")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?next=%2F");

        let page = body_text(browser.get("/login").await).await;
        assert!(page.contains(STORAGE_FAILED));
        assert!(!page.contains("Invalid username or password"));
    }
}
