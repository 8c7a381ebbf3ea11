//! Cart store with derived totals and an order-limit invariant.
//!
//! The cart is an in-memory mapping from item display name to quantity,
//! kind, and unit price. Every mutation persists the serialized cart to
//! durable storage; an empty cart removes the persisted key entirely so
//! "no cart" stays distinguishable from "empty cart".

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use tableside_core::{ItemKind, display_usd};

use crate::error::add_breadcrumb;
use crate::storage::{self, KeyValueStorage, StorageError, keys};

/// One line of the cart, keyed externally by item display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Kind of the menu item.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Number of this item in the cart.
    pub quantity: u32,
    /// Price per item, in dollars.
    #[serde(rename = "unitPrice")]
    pub unit_price: Decimal,
}

/// Serialized cart shape, shared with the order server and durable storage.
pub type CartEntries = BTreeMap<String, CartEntry>;

/// Errors returned by cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The mutation would push the total quantity past the order limit.
    /// The cart is left unchanged.
    #[error("Order limit of {limit} items exceeded")]
    LimitExceeded {
        /// Configured order limit.
        limit: u32,
    },

    /// `set_quantity` was called for an item that is not in the cart.
    #[error("Item not in cart: {0}")]
    UnknownItem(String),

    /// Persisting the cart to durable storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The user's in-progress order.
///
/// Owned by the top-level application state; components receive explicit
/// references rather than reaching for globals. Mutations are serialized by
/// the owner (one completes before the next is applied).
#[derive(Clone)]
pub struct CartStore {
    entries: CartEntries,
    limit: u32,
    storage: Arc<dyn KeyValueStorage>,
}

impl CartStore {
    /// Create an empty cart with the given order limit.
    pub fn new(limit: u32, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            entries: CartEntries::new(),
            limit,
            storage,
        }
    }

    /// Load the locally persisted cart, if one exists.
    ///
    /// Used at startup before session bootstrap runs.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the persisted cart cannot be read.
    pub fn restore(&mut self) -> Result<(), CartError> {
        if let Some(entries) = storage::get_json::<CartEntries>(&*self.storage, keys::STORED_CART)?
        {
            self.entries = self.fit_to_limit(entries);
        }
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of an item, merging into an existing entry.
    ///
    /// Adding zero is a no-op that still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LimitExceeded` (leaving the cart unchanged) when
    /// the resulting total would pass the order limit.
    pub fn add_item(
        &mut self,
        name: &str,
        kind: ItemKind,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Ok(());
        }

        if self.would_exceed_limit(self.total_count(), quantity) {
            return Err(CartError::LimitExceeded { limit: self.limit });
        }

        self.entries
            .entry(name.to_string())
            .and_modify(|entry| entry.quantity += quantity)
            .or_insert(CartEntry {
                kind,
                quantity,
                unit_price,
            });

        add_breadcrumb("cart", "Added item", Some(&[("item", name)]));
        self.persist()
    }

    /// Set an item's quantity directly (quantity-field edit).
    ///
    /// Setting zero removes the item.
    ///
    /// # Errors
    ///
    /// Returns `CartError::UnknownItem` if the item is not in the cart and
    /// `CartError::LimitExceeded` (cart unchanged) on a limit violation.
    pub fn set_quantity(&mut self, name: &str, quantity: u32) -> Result<(), CartError> {
        let Some(entry) = self.entries.get(name) else {
            return Err(CartError::UnknownItem(name.to_string()));
        };

        if quantity == 0 {
            return self.remove_item(name);
        }

        // Limit check against the total minus this item's previous quantity
        if self.would_exceed_limit(self.total_count() - entry.quantity, quantity) {
            return Err(CartError::LimitExceeded { limit: self.limit });
        }

        if let Some(entry) = self.entries.get_mut(name) {
            entry.quantity = quantity;
        }
        self.persist()
    }

    /// Remove an item unconditionally. Removing an absent item is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if persisting fails.
    pub fn remove_item(&mut self, name: &str) -> Result<(), CartError> {
        if self.entries.remove(name).is_some() {
            add_breadcrumb("cart", "Removed item", Some(&[("item", name)]));
        }
        self.persist()
    }

    /// Empty the cart and delete its persisted representation.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the persisted key cannot be removed.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.entries.clear();
        add_breadcrumb("cart", "Cleared cart", None);
        self.persist()
    }

    /// Replace the cart wholesale with reconciled entries.
    ///
    /// Used by session bootstrap after merging the local and server carts.
    /// Entries are admitted in name order until the order limit is reached;
    /// anything past the limit is dropped with a warning, since server data
    /// may have been written under a different limit.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if persisting fails.
    pub fn replace_entries(&mut self, entries: CartEntries) -> Result<(), CartError> {
        self.entries = self.fit_to_limit(entries);
        self.persist()
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    /// Total quantity across all entries.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.entries.values().map(|e| e.quantity).sum()
    }

    /// Sum of quantity times unit price across all entries.
    ///
    /// Internal arithmetic stays in decimal; rounding happens only in
    /// [`CartStore::display_total`].
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.entries
            .values()
            .map(|e| e.unit_price * Decimal::from(e.quantity))
            .sum()
    }

    /// The cart total formatted for display, rounded to two decimals.
    #[must_use]
    pub fn display_total(&self) -> String {
        display_usd(self.total_price())
    }

    /// Read-only view of the entries.
    #[must_use]
    pub const fn entries(&self) -> &CartEntries {
        &self.entries
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured order limit.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the cart to durable storage; an empty cart removes the key.
    fn persist(&self) -> Result<(), CartError> {
        if self.entries.is_empty() {
            self.storage.remove(keys::STORED_CART)?;
        } else {
            storage::set_json(&*self.storage, keys::STORED_CART, &self.entries)?;
        }
        Ok(())
    }

    /// Whether adding `quantity` on top of `current` would pass the limit.
    ///
    /// Compares in `u64`: quantities near `u32::MAX` (a hostile persisted
    /// cart, or a wild CLI argument) must be rejected, not wrapped around.
    fn would_exceed_limit(&self, current: u32, quantity: u32) -> bool {
        u64::from(current) + u64::from(quantity) > u64::from(self.limit)
    }

    /// Admit entries in name order until the limit is reached.
    fn fit_to_limit(&self, entries: CartEntries) -> CartEntries {
        let mut admitted = CartEntries::new();
        let mut count = 0u32;
        let mut dropped = 0usize;

        for (name, entry) in entries {
            if self.would_exceed_limit(count, entry.quantity) {
                dropped += 1;
            } else {
                count += entry.quantity;
                admitted.insert(name, entry);
            }
        }

        if dropped > 0 {
            warn!(dropped, limit = self.limit, "Dropped cart entries over the order limit");
        }

        admitted
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn cart_with_limit(limit: u32) -> (CartStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (CartStore::new(limit, storage.clone()), storage)
    }

    #[test]
    fn test_add_creates_and_merges() {
        let (mut cart, _) = cart_with_limit(10);

        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 2)
            .unwrap();
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 1)
            .unwrap();

        assert_eq!(cart.total_count(), 3);
        assert_eq!(cart.entries().get("Pad Thai").unwrap().quantity, 3);
    }

    #[test]
    fn test_add_rejected_at_limit_leaves_cart_unchanged() {
        let (mut cart, _) = cart_with_limit(10);
        cart.add_item("Spring Rolls", ItemKind::Appetizer, dec("4.00"), 10)
            .unwrap();

        let err = cart
            .add_item("Thai Iced Tea", ItemKind::Drink, dec("3.50"), 1)
            .unwrap_err();
        assert!(matches!(err, CartError::LimitExceeded { limit: 10 }));
        assert_eq!(cart.total_count(), 10);
        assert!(!cart.entries().contains_key("Thai Iced Tea"));
    }

    #[test]
    fn test_add_huge_quantity_rejected_without_overflow() {
        let (mut cart, _) = cart_with_limit(10);
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 1)
            .unwrap();

        // 1 + u32::MAX wraps in u32; the check must still reject
        let err = cart
            .add_item("Thai Iced Tea", ItemKind::Drink, dec("3.50"), u32::MAX)
            .unwrap_err();
        assert!(matches!(err, CartError::LimitExceeded { limit: 10 }));
        assert_eq!(cart.total_count(), 1);
    }

    #[test]
    fn test_set_huge_quantity_rejected_without_overflow() {
        let (mut cart, _) = cart_with_limit(10);
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 2)
            .unwrap();
        cart.add_item("Thai Iced Tea", ItemKind::Drink, dec("3.50"), 3)
            .unwrap();

        let err = cart.set_quantity("Pad Thai", u32::MAX).unwrap_err();
        assert!(matches!(err, CartError::LimitExceeded { .. }));
        assert_eq!(cart.entries().get("Pad Thai").unwrap().quantity, 2);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let (mut cart, storage) = cart_with_limit(10);
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 0)
            .unwrap();

        assert!(cart.is_empty());
        assert!(storage.get(keys::STORED_CART).unwrap().is_none());
    }

    #[test]
    fn test_set_quantity_respects_limit_against_replaced_amount() {
        let (mut cart, _) = cart_with_limit(10);
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 6)
            .unwrap();
        cart.add_item("Thai Iced Tea", ItemKind::Drink, dec("3.50"), 4)
            .unwrap();

        // 10 - 6 + 6 = 10: replacing an item's own quantity at the limit is fine
        cart.set_quantity("Pad Thai", 6).unwrap();

        // 10 - 6 + 7 = 11: over
        let err = cart.set_quantity("Pad Thai", 7).unwrap_err();
        assert!(matches!(err, CartError::LimitExceeded { .. }));
        assert_eq!(cart.entries().get("Pad Thai").unwrap().quantity, 6);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let (mut cart, _) = cart_with_limit(10);
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 2)
            .unwrap();

        cart.set_quantity("Pad Thai", 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_unknown_item() {
        let (mut cart, _) = cart_with_limit(10);
        let err = cart.set_quantity("Ghost Dish", 1).unwrap_err();
        assert!(matches!(err, CartError::UnknownItem(_)));
    }

    #[test]
    fn test_totals() {
        let (mut cart, _) = cart_with_limit(50);
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 2)
            .unwrap();
        cart.add_item("Thai Iced Tea", ItemKind::Drink, dec("3.25"), 3)
            .unwrap();

        assert_eq!(cart.total_count(), 5);
        assert_eq!(cart.total_price(), dec("34.75"));
        assert_eq!(cart.display_total(), "$34.75");
    }

    #[test]
    fn test_remove_drops_quantity_and_price() {
        let (mut cart, _) = cart_with_limit(50);
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 2)
            .unwrap();
        cart.add_item("Thai Iced Tea", ItemKind::Drink, dec("3.25"), 3)
            .unwrap();

        cart.remove_item("Pad Thai").unwrap();

        assert_eq!(cart.total_count(), 3);
        assert_eq!(cart.total_price(), dec("9.75"));
        assert!(!cart.entries().contains_key("Pad Thai"));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let (mut cart, _) = cart_with_limit(50);
        assert!(cart.remove_item("Ghost Dish").is_ok());
    }

    #[test]
    fn test_mutations_persist_to_storage() {
        let (mut cart, storage) = cart_with_limit(50);
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 2)
            .unwrap();

        let raw = storage.get(keys::STORED_CART).unwrap().unwrap();
        let persisted: CartEntries = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.get("Pad Thai").unwrap().quantity, 2);
        // Wire field names match the server contract
        assert!(raw.contains("\"unitPrice\""));
        assert!(raw.contains("\"type\""));
    }

    #[test]
    fn test_clearing_removes_persisted_key_entirely() {
        let (mut cart, storage) = cart_with_limit(50);
        cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 2)
            .unwrap();
        assert!(storage.get(keys::STORED_CART).unwrap().is_some());

        cart.clear().unwrap();
        // Absent, not an empty JSON object
        assert!(storage.get(keys::STORED_CART).unwrap().is_none());
    }

    #[test]
    fn test_restore_reads_persisted_cart() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let mut cart = CartStore::new(50, storage.clone());
            cart.add_item("Pad Thai", ItemKind::Entree, dec("12.50"), 2)
                .unwrap();
        }

        let mut cart = CartStore::new(50, storage);
        cart.restore().unwrap();
        assert_eq!(cart.total_count(), 2);
    }

    #[test]
    fn test_replace_entries_truncates_over_limit() {
        let (mut cart, _) = cart_with_limit(5);

        let mut entries = CartEntries::new();
        entries.insert(
            "A Salad".to_string(),
            CartEntry {
                kind: ItemKind::Appetizer,
                quantity: 4,
                unit_price: dec("6.00"),
            },
        );
        entries.insert(
            "B Curry".to_string(),
            CartEntry {
                kind: ItemKind::Entree,
                quantity: 4,
                unit_price: dec("11.00"),
            },
        );
        entries.insert(
            "C Tea".to_string(),
            CartEntry {
                kind: ItemKind::Drink,
                quantity: 1,
                unit_price: dec("3.00"),
            },
        );

        cart.replace_entries(entries).unwrap();

        // 4 (A) fits, 4 more (B) would pass 5, 1 more (C) still fits
        assert_eq!(cart.total_count(), 5);
        assert!(cart.entries().contains_key("A Salad"));
        assert!(!cart.entries().contains_key("B Curry"));
        assert!(cart.entries().contains_key("C Tea"));
    }

    #[test]
    fn test_replace_entries_drops_huge_quantity_without_overflow() {
        let (mut cart, _) = cart_with_limit(10);

        // Persisted or server data is untrusted; a quantity at u32::MAX must
        // be dropped, not wrapped into range
        let mut entries = CartEntries::new();
        entries.insert(
            "A Salad".to_string(),
            CartEntry {
                kind: ItemKind::Appetizer,
                quantity: 4,
                unit_price: dec("6.00"),
            },
        );
        entries.insert(
            "B Curry".to_string(),
            CartEntry {
                kind: ItemKind::Entree,
                quantity: u32::MAX,
                unit_price: dec("11.00"),
            },
        );

        cart.replace_entries(entries).unwrap();

        assert_eq!(cart.total_count(), 4);
        assert!(!cart.entries().contains_key("B Curry"));
    }
}
