//! Application state shared across the client.
//!
//! One explicit container owns the config, the API client, durable storage,
//! and the cart store; components receive references rather than reaching
//! for globals. Cart mutations are serialized through a mutex so one
//! completes before the next is applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tableside_core::AccessToken;

use crate::api::OrderApiClient;
use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::SessionState;
use crate::storage::{self, FileStorage, KeyValueStorage, keys};

/// Application state shared across all flows.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    api: OrderApiClient,
    storage: Arc<dyn KeyValueStorage>,
    cart: Mutex<CartStore>,
    session: Mutex<SessionState>,
}

impl AppState {
    /// Create application state backed by file storage at the configured
    /// data directory.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let storage: Arc<dyn KeyValueStorage> =
            Arc::new(FileStorage::new(config.data_dir.clone()));
        Self::with_storage(config, storage)
    }

    /// Create application state over an explicit storage backend.
    ///
    /// Tests use this with in-memory storage.
    #[must_use]
    pub fn with_storage(config: ClientConfig, storage: Arc<dyn KeyValueStorage>) -> Self {
        let api = OrderApiClient::new(&config);
        let cart = Mutex::new(CartStore::new(config.order_limit, storage.clone()));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                storage,
                cart,
                session: Mutex::new(SessionState::unauthenticated()),
            }),
        }
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the order server API client.
    #[must_use]
    pub fn api(&self) -> &OrderApiClient {
        &self.inner.api
    }

    /// Get a reference to durable storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStorage> {
        &self.inner.storage
    }

    /// Lock the cart store for a mutation or read.
    ///
    /// Do not hold the guard across an await point.
    #[must_use]
    pub fn cart(&self) -> MutexGuard<'_, CartStore> {
        self.inner
            .cart
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current session state.
    #[must_use]
    pub fn session(&self) -> SessionState {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the session state.
    pub fn set_session(&self, session: SessionState) {
        *self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Read the persisted access token, if any.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the persisted token cannot be read.
    pub fn current_token(&self) -> Result<Option<AccessToken>, ClientError> {
        Ok(storage::get_json(
            &*self.inner.storage,
            keys::CURRENT_ACCESS_TOKEN,
        )?)
    }
}
