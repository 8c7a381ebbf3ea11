//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ClientError` for callers that drive whole flows
//! (bootstrap, checkout) and helpers that capture errors to Sentry before
//! they surface to the user.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::ValidationError;
use crate::cart::CartError;
use crate::checkout::CheckoutError;
use crate::storage::StorageError;

/// Application-level error type for the Tableside client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Order server API operation failed.
    #[error("Server error: {0}")]
    Api(#[from] ApiError),

    /// Durable storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart mutation rejected or failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout flow failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Client-side field validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Whether the error warrants capture to Sentry.
    ///
    /// Validation errors are user input, not defects; connection errors are
    /// expected on flaky networks and surface as retryable notifications.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Api(api) => !matches!(api, ApiError::Connection(_)),
            _ => true,
        }
    }

    /// Capture the error to Sentry if it is reportable, then return it.
    ///
    /// Call at the outermost layer before surfacing the error to the user.
    #[must_use]
    pub fn report(self) -> Self {
        if self.is_reportable() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Client error"
            );
        }
        self
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Set the Sentry user context from an email address.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user
/// actions leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Internal("state desync".to_string());
        assert_eq!(err.to_string(), "Internal error: state desync");
    }

    #[test]
    fn test_validation_errors_not_reportable() {
        let err = ClientError::Validation(ValidationError::Required(crate::auth::Field::Email));
        assert!(!err.is_reportable());
    }

    #[test]
    fn test_server_response_errors_reportable() {
        let err = ClientError::Api(ApiError::Response {
            status: 500,
            message: "boom".to_string(),
        });
        assert!(err.is_reportable());
    }
}
