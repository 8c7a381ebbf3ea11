//! Debounced cart persistence to the order server.
//!
//! Rapid quantity edits should not each hit the network: edits within the
//! configured window (800 ms by default) coalesce into a single save
//! carrying the final cart. Last write wins; in-flight requests are not
//! cancelled.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tableside_core::AccessToken;

use crate::api::OrderApiClient;
use crate::cart::CartEntries;

/// Coalesces bursts of work into a single deferred execution.
///
/// Each `schedule` call replaces any pending one, so only the last action
/// of a burst runs, after the window of quiet.
pub struct Debouncer {
    window: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Schedule `action` to run after the window, cancelling any pending
    /// action scheduled earlier.
    pub fn schedule<F, Fut>(&mut self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            action().await;
        }));
    }

    /// Wait for the pending action, if any, to run to completion.
    ///
    /// Call before shutdown so a trailing edit is not lost.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.pending.take() {
            // Abort-induced cancellation is fine; anything else is not
            if let Err(e) = handle.await
                && !e.is_cancelled()
            {
                warn!(error = %e, "Debounced action panicked");
            }
        }
    }

    /// Drop the pending action without running it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Pushes cart changes to the server, debounced.
pub struct CartSyncer {
    api: OrderApiClient,
    debouncer: Debouncer,
}

impl CartSyncer {
    /// Create a syncer with the configured debounce window.
    #[must_use]
    pub const fn new(api: OrderApiClient, window: Duration) -> Self {
        Self {
            api,
            debouncer: Debouncer::new(window),
        }
    }

    /// Note a cart change; the final state of a burst is saved once the
    /// window passes. An empty cart clears the server copy instead.
    ///
    /// Sync failures are logged, not surfaced: the cart is already durable
    /// locally and the next change retries.
    pub fn cart_changed(&mut self, token: &AccessToken, entries: &CartEntries) {
        let api = self.api.clone();
        let token = token.clone();
        let entries = entries.clone();

        self.debouncer.schedule(move || async move {
            let result = if entries.is_empty() {
                api.clear_cart(&token).await
            } else {
                api.save_cart(&token, &entries).await
            };
            match result {
                Ok(()) => debug!("Cart synced to server"),
                Err(e) => warn!(error = %e, "Cart sync failed; will retry on next change"),
            }
        });
    }

    /// Wait for a pending sync to finish (e.g., before shutdown).
    pub async fn settle(&mut self) {
        self.debouncer.settle().await;
    }
}
