//! Wire types for the order server REST API.
//!
//! Field names follow the server's JSON contract (camelCase on the wire,
//! snake_case in Rust). Decimal amounts travel as strings to avoid float
//! loss.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tableside_core::{Email, ItemKind};

use crate::cart::CartEntries;

/// Envelope every successful server payload arrives in.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// The actual payload.
    pub response: T,
}

/// Account profile returned by `GET /users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Server-side cart snapshot, if the account has one saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart: Option<CartEntries>,
}

/// Profile fields a `PUT /users` update may change.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    /// New display name, if changing.
    pub name: Option<String>,
    /// New password, if changing.
    pub password: Option<secrecy::SecretString>,
}

/// One item of the restaurant menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Display name, unique within the menu.
    pub name: String,
    /// Item classification.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Price per item, in dollars.
    #[serde(rename = "unitPrice")]
    pub unit_price: Decimal,
    /// Menu description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Photo id for the (out-of-scope) UI to resolve into an image.
    #[serde(rename = "photoId", default, skip_serializing_if = "Option::is_none")]
    pub photo_id: Option<String>,
}

/// Payment intent issued by the server's checkout endpoint.
///
/// `amount` is the server-authoritative total; older server versions call
/// the field `updatedCartTotal` instead of `currentAmount`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutIntent {
    /// Secret handed to the payment gateway to confirm the charge.
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    /// Authoritative amount to display and charge, in dollars.
    #[serde(rename = "currentAmount", alias = "updatedCartTotal")]
    pub amount: Decimal,
}
