//! Tableside client library.
//!
//! The client side of the Tableside food-ordering application: an in-memory
//! cart store with an order-limit invariant, token-based session bootstrap,
//! a checkout coordinator driving an external payment gateway, and the auth
//! flows, all talking to the order server over its REST API.
//!
//! # Modules
//!
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Unified error type and Sentry helpers
//! - [`api`] - Order server REST client
//! - [`storage`] - Durable client-side key-value storage
//! - [`cart`] - Cart store with derived totals
//! - [`session`] - Session state and bootstrap/logout
//! - [`checkout`] - Checkout state machine and payment gateway seam
//! - [`auth`] - Field validation and login/signup flows
//! - [`menu`] - Cached menu fetch
//! - [`sync`] - Debounced cart persistence to the server
//! - [`state`] - Shared application state container

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod menu;
pub mod session;
pub mod state;
pub mod storage;
pub mod sync;
