//! Order server REST API client.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest`; every successful payload arrives wrapped in
//!   an `{"response": <payload>}` envelope
//! - The server is the source of truth for accounts, carts, and checkout
//!   amounts; no local sync beyond what the cart store persists
//! - The menu is cached in-memory via `moka` (TTL from config)
//!
//! # Example
//!
//! ```rust,ignore
//! use tableside_client::api::OrderApiClient;
//!
//! let api = OrderApiClient::new(&config);
//!
//! api.ping().await?;
//! let token = api.login(&email, &password).await?;
//! let profile = api.fetch_user(&token).await?;
//! ```

mod client;
pub mod types;

pub use client::OrderApiClient;

use thiserror::Error;

/// Errors that can occur when talking to the order server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure: the server was unreachable or the connection
    /// dropped mid-request.
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// The server answered with a non-2xx status and a message.
    #[error("Server responded {status}: {message}")]
    Response {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the server.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// An endpoint path did not form a valid URL against the base.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the server rejected the caller's credentials.
    ///
    /// Session bootstrap uses this to distinguish "token is dead, force a
    /// logout" from transient failures the caller may retry.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Response {
                status: 401 | 403,
                ..
            }
        )
    }

    /// HTTP status of the server's response, if there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Extract a human-readable message from an error response body.
///
/// The server answers errors with either plain text or a JSON object
/// (`{"response": "..."}` or `{"error": "..."}`); fall back to the raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["response", "error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.trim().to_string()
}
