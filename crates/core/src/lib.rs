//! Tableside Core - Shared types library.
//!
//! This crate provides common types used across all Tableside components:
//! - `client` - Cart, session, checkout, and auth logic against the order server
//! - `cli` - Command-line front-end for the client library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails, access tokens, item kinds, and money

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
