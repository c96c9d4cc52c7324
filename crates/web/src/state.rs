//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StockroomConfig;
use crate::db::{ItemStore, Stores, UserStore};
use crate::services::auth::AuthService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the stores and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StockroomConfig,
    stores: Stores,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StockroomConfig, stores: Stores) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, stores }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &StockroomConfig {
        &self.inner.config
    }

    /// Get the user store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.stores.users.as_ref()
    }

    /// Get the item store.
    #[must_use]
    pub fn items(&self) -> &dyn ItemStore {
        self.inner.stores.items.as_ref()
    }

    /// Authentication service over the user store.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.users())
    }
}
