//! Session state, bootstrap, and logout.
//!
//! On startup the client reads the persisted access token and tries to
//! restore the session against the server. A rejected token forces a local
//! logout; any other failure is left to the caller to retry.

use chrono::Utc;
use tracing::{info, instrument, warn};

use tableside_core::AccessToken;

use crate::api::OrderApiClient;
use crate::api::types::UserProfile;
use crate::cart::{CartEntries, CartStore};
use crate::error::{ClientError, clear_sentry_user, set_sentry_user};
use crate::storage::{self, KeyValueStorage, keys};

/// Authentication state of the running client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    user: Option<UserProfile>,
    authenticated: bool,
}

impl SessionState {
    /// No user is signed in.
    #[must_use]
    pub const fn unauthenticated() -> Self {
        Self {
            user: None,
            authenticated: false,
        }
    }

    /// A server-confirmed user is signed in.
    #[must_use]
    pub const fn authenticated(user: UserProfile) -> Self {
        Self {
            user: Some(user),
            authenticated: true,
        }
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Profile of the signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }
}

/// Merge the locally persisted cart with the server-reported one.
///
/// The local cart takes precedence; the server cart is only a fallback for
/// a device that has no cart of its own.
#[must_use]
pub fn reconcile_carts(local: Option<CartEntries>, server: Option<CartEntries>) -> CartEntries {
    match local {
        Some(entries) if !entries.is_empty() => entries,
        _ => server.unwrap_or_default(),
    }
}

/// Restore the session from the persisted access token.
///
/// - No token: stays unauthenticated.
/// - Token rejected by the server (401-class) or already expired locally:
///   the token is deleted and the session stays unauthenticated.
/// - Token confirmed: the session is authenticated and the cart store is
///   hydrated with the reconciled cart.
///
/// # Errors
///
/// Propagates storage failures and non-auth server failures; the caller is
/// expected to surface a connectivity error and offer retry.
#[instrument(skip_all)]
pub async fn bootstrap(
    api: &OrderApiClient,
    storage: &dyn KeyValueStorage,
    cart: &mut CartStore,
) -> Result<SessionState, ClientError> {
    let Some(token) =
        storage::get_json::<AccessToken>(storage, keys::CURRENT_ACCESS_TOKEN)?
    else {
        return Ok(SessionState::unauthenticated());
    };

    // Skip the lookup when the token is already past its own expiry; the
    // server would answer 401 anyway.
    if token.is_expired(Utc::now()) {
        info!(email = %token.email, "Persisted token expired, forcing logout");
        storage.remove(keys::CURRENT_ACCESS_TOKEN)?;
        clear_sentry_user();
        return Ok(SessionState::unauthenticated());
    }

    match api.fetch_user(&token).await {
        Ok(profile) => {
            let local = storage::get_json::<CartEntries>(storage, keys::STORED_CART)?;
            let merged = reconcile_carts(local, profile.cart.clone());
            cart.replace_entries(merged)?;

            set_sentry_user(profile.email.as_str());
            info!(email = %profile.email, "Session restored");
            Ok(SessionState::authenticated(profile))
        }
        Err(e) if e.is_unauthorized() => {
            warn!(email = %token.email, "Server rejected persisted token, forcing logout");
            storage.remove(keys::CURRENT_ACCESS_TOKEN)?;
            clear_sentry_user();
            Ok(SessionState::unauthenticated())
        }
        Err(e) => Err(e.into()),
    }
}

/// Sign out: invalidate the token server-side and clear local session state.
///
/// The current cart is snapshotted to [`keys::PREV_STORED_CART`] before
/// clearing so a later sign-in on this device can inspect it. A failed
/// server-side invalidation is logged but does not keep the user signed in
/// locally.
///
/// # Errors
///
/// Returns `ClientError::Storage`/`ClientError::Cart` if local cleanup fails.
#[instrument(skip_all)]
pub async fn logout(
    api: &OrderApiClient,
    storage: &dyn KeyValueStorage,
    cart: &mut CartStore,
) -> Result<SessionState, ClientError> {
    if let Some(token) = storage::get_json::<AccessToken>(storage, keys::CURRENT_ACCESS_TOKEN)? {
        if let Err(e) = api.logout(&token).await {
            warn!(error = %e, "Server-side token invalidation failed; clearing locally");
        }
    }

    if !cart.is_empty() {
        storage::set_json(storage, keys::PREV_STORED_CART, cart.entries())?;
    }
    cart.clear()?;
    storage.remove(keys::CURRENT_ACCESS_TOKEN)?;
    clear_sentry_user();

    Ok(SessionState::unauthenticated())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::CartEntry;
    use crate::config::ClientConfig;
    use crate::storage::MemoryStorage;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;
    use tableside_core::{Email, ItemKind};

    fn entries_with(name: &str, quantity: u32) -> CartEntries {
        let mut entries = CartEntries::new();
        entries.insert(
            name.to_string(),
            CartEntry {
                kind: ItemKind::Entree,
                quantity,
                unit_price: "10.00".parse().unwrap(),
            },
        );
        entries
    }

    fn offline_api() -> OrderApiClient {
        let config = ClientConfig {
            server_url: "http://127.0.0.1:9/".parse().unwrap(),
            order_limit: 50,
            sync_debounce: std::time::Duration::from_millis(800),
            menu_ttl: std::time::Duration::from_secs(300),
            data_dir: std::env::temp_dir(),
            sentry_dsn: None,
        };
        OrderApiClient::new(&config)
    }

    #[test]
    fn test_reconcile_local_takes_precedence() {
        let local = entries_with("Pad Thai", 2);
        let server = entries_with("Green Curry", 1);

        let merged = reconcile_carts(Some(local.clone()), Some(server));
        assert_eq!(merged, local);
    }

    #[test]
    fn test_reconcile_falls_back_to_server() {
        let server = entries_with("Green Curry", 1);

        let merged = reconcile_carts(None, Some(server.clone()));
        assert_eq!(merged, server);

        // An empty local cart is "no cart", not an override
        let merged = reconcile_carts(Some(CartEntries::new()), Some(server.clone()));
        assert_eq!(merged, server);
    }

    #[test]
    fn test_reconcile_both_absent() {
        assert!(reconcile_carts(None, None).is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_without_token_stays_unauthenticated() {
        let storage = Arc::new(MemoryStorage::new());
        let mut cart = CartStore::new(50, storage.clone());

        let session = bootstrap(&offline_api(), &*storage, &mut cart)
            .await
            .unwrap();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_expired_token_is_deleted_without_network() {
        let storage = Arc::new(MemoryStorage::new());
        let token = AccessToken {
            email: Email::parse("diner@example.com").unwrap(),
            id: "tok_expired".to_string(),
            expires_at: Utc::now() - ChronoDuration::hours(2),
        };
        storage::set_json(&*storage, keys::CURRENT_ACCESS_TOKEN, &token).unwrap();

        let mut cart = CartStore::new(50, storage.clone());
        // The API client points at a dead address; an attempted lookup would
        // surface a connection error instead of a clean unauthenticated state.
        let session = bootstrap(&offline_api(), &*storage, &mut cart)
            .await
            .unwrap();

        assert!(!session.is_authenticated());
        assert!(
            storage
                .get(keys::CURRENT_ACCESS_TOKEN)
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_logout_snapshots_and_clears() {
        let storage = Arc::new(MemoryStorage::new());
        let mut cart = CartStore::new(50, storage.clone());
        cart.add_item("Pad Thai", ItemKind::Entree, "12.50".parse().unwrap(), 2)
            .unwrap();

        let session = logout(&offline_api(), &*storage, &mut cart).await.unwrap();

        assert!(!session.is_authenticated());
        assert!(cart.is_empty());
        assert!(storage.get(keys::STORED_CART).unwrap().is_none());
        assert!(storage.get(keys::CURRENT_ACCESS_TOKEN).unwrap().is_none());

        let snapshot: Option<CartEntries> =
            storage::get_json(&*storage, keys::PREV_STORED_CART).unwrap();
        assert_eq!(snapshot.unwrap().get("Pad Thai").unwrap().quantity, 2);
    }
}
