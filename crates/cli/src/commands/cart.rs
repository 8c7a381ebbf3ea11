//! Cart commands.
//!
//! Every mutation persists locally first, then pushes to the server when a
//! token is present. The process is one-shot, so the debounced sync is
//! settled before returning rather than waiting for a next change.

use rust_decimal::Decimal;

use tableside_core::{ItemKind, display_usd};
use tableside_client::error::ClientError;
use tableside_client::state::AppState;
use tableside_client::sync::CartSyncer;

/// Add `quantity` of an item to the cart.
pub async fn add(
    state: &AppState,
    name: &str,
    kind: ItemKind,
    price: Decimal,
    quantity: u32,
) -> Result<(), ClientError> {
    {
        let mut cart = state.cart();
        cart.restore()?;
        cart.add_item(name, kind, price, quantity)?;
        println!(
            "Added {quantity} x {name}; {} items, total {}",
            cart.total_count(),
            cart.display_total()
        );
    }
    push(state).await
}

/// Set an item's quantity (zero removes it).
pub async fn set(state: &AppState, name: &str, quantity: u32) -> Result<(), ClientError> {
    {
        let mut cart = state.cart();
        cart.restore()?;
        cart.set_quantity(name, quantity)?;
        println!(
            "{name} set to {quantity}; {} items, total {}",
            cart.total_count(),
            cart.display_total()
        );
    }
    push(state).await
}

/// Remove an item.
pub async fn remove(state: &AppState, name: &str) -> Result<(), ClientError> {
    {
        let mut cart = state.cart();
        cart.restore()?;
        cart.remove_item(name)?;
        println!(
            "Removed {name}; {} items, total {}",
            cart.total_count(),
            cart.display_total()
        );
    }
    push(state).await
}

/// Print the cart with line and grand totals.
pub fn show(state: &AppState) -> Result<(), ClientError> {
    let mut cart = state.cart();
    cart.restore()?;

    if cart.is_empty() {
        println!("Cart is empty");
        return Ok(());
    }

    for (name, entry) in cart.entries() {
        let line_total = entry.unit_price * Decimal::from(entry.quantity);
        println!(
            "{:>3} x {name} ({}) @ {} = {}",
            entry.quantity,
            entry.kind,
            display_usd(entry.unit_price),
            display_usd(line_total)
        );
    }
    println!(
        "{} items, total {}",
        cart.total_count(),
        cart.display_total()
    );
    Ok(())
}

/// Empty the cart.
pub async fn clear(state: &AppState) -> Result<(), ClientError> {
    {
        let mut cart = state.cart();
        cart.restore()?;
        cart.clear()?;
    }
    println!("Cart cleared");
    push(state).await
}

/// Push the current cart to the server when signed in.
async fn push(state: &AppState) -> Result<(), ClientError> {
    let Some(token) = state.current_token()? else {
        return Ok(());
    };

    let entries = state.cart().entries().clone();
    let mut syncer = CartSyncer::new(state.api().clone(), state.config().sync_debounce);
    syncer.cart_changed(&token, &entries);
    syncer.settle().await;
    Ok(())
}
