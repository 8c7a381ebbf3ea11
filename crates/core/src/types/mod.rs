//! Core types for Tableside.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod item;
pub mod money;
pub mod token;

pub use email::{Email, EmailError};
pub use item::ItemKind;
pub use money::display_usd;
pub use token::AccessToken;
