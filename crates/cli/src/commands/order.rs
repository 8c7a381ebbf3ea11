//! Server-facing commands: liveness, menu, checkout.

use tableside_core::display_usd;
use tableside_client::checkout::{CheckoutCoordinator, CheckoutState};
use tableside_client::error::ClientError;
use tableside_client::state::AppState;

/// Check the order server is reachable.
pub async fn ping(state: &AppState) -> Result<(), ClientError> {
    state.api().ping().await?;
    println!("Order server is up");
    Ok(())
}

/// Fetch and print the menu.
pub async fn menu(state: &AppState) -> Result<(), ClientError> {
    let Some(token) = state.current_token()? else {
        return Err(ClientError::Internal("Not signed in".to_string()));
    };

    let items = tableside_client::menu::fetch_menu(state.api(), &**state.storage(), &token).await?;
    if items.is_empty() {
        println!("The menu is empty");
        return Ok(());
    }

    for item in items.iter() {
        let price = display_usd(item.unit_price);
        match &item.description {
            Some(description) => {
                println!("{} ({}) - {price}: {description}", item.name, item.kind);
            }
            None => println!("{} ({}) - {price}", item.name, item.kind),
        }
    }
    Ok(())
}

/// Create a payment intent and print the server-confirmed total.
///
/// Stops at ReadyToPay: confirming the charge needs the payment provider's
/// SDK, which a terminal session does not carry.
pub async fn checkout(state: &AppState) -> Result<(), ClientError> {
    let Some(token) = state.current_token()? else {
        return Err(ClientError::Internal("Not signed in".to_string()));
    };

    let client_total = {
        let mut cart = state.cart();
        cart.restore()?;
        if cart.is_empty() {
            println!("Cart is empty; add items before checking out");
            return Ok(());
        }
        cart.total_price()
    };

    let mut coordinator = CheckoutCoordinator::new();
    coordinator.load(state.api(), &token, client_total).await?;

    match coordinator.state() {
        CheckoutState::Failed { message } => println!("Checkout failed: {message}"),
        _ => {
            if let Some(total) = coordinator.displayed_total() {
                println!("Ready to pay: server-confirmed total {total}");
            }
        }
    }
    Ok(())
}
