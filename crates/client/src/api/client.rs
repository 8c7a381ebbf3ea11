//! Order server API client implementation.
//!
//! Plain JSON over `reqwest`. Responses are read as text first for better
//! diagnostics when parsing fails. The menu is cached via `moka` with the
//! configured TTL.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::RequestBuilder;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use tableside_core::{AccessToken, Email};

use crate::api::types::{CheckoutIntent, Envelope, MenuItem, ProfileUpdate, UserProfile};
use crate::api::{ApiError, extract_error_message};
use crate::cart::CartEntries;
use crate::config::ClientConfig;

/// Client for the order server REST API.
///
/// Cheap to clone; all clones share one connection pool and menu cache.
#[derive(Clone)]
pub struct OrderApiClient {
    inner: Arc<OrderApiClientInner>,
}

struct OrderApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    menu_cache: Cache<String, Arc<Vec<MenuItem>>>,
}

impl OrderApiClient {
    /// Create a new order server client.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let menu_cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.menu_ttl)
            .build();

        Self {
            inner: Arc::new(OrderApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.server_url.clone(),
                menu_cache,
            }),
        }
    }

    /// Build a URL for `path`, optionally carrying the `email` query the
    /// server scopes most endpoints by.
    fn endpoint(&self, path: &str, email: Option<&Email>) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.join(path)?;
        if let Some(email) = email {
            url.query_pairs_mut().append_pair("email", email.as_str());
        }
        Ok(url)
    }

    /// Send a request and unwrap the `{"response": ...}` envelope.
    async fn request<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Order server returned non-success status"
            );
            return Err(ApiError::Response {
                status: status.as_u16(),
                message: extract_error_message(&response_text),
            });
        }

        match serde_json::from_str::<Envelope<T>>(&response_text) {
            Ok(envelope) => Ok(envelope.response),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse order server response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    /// Like [`Self::request`] but discards the payload. Endpoints that only
    /// acknowledge (deletes, saves) wrap a message string we don't need.
    async fn request_ack(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.request::<serde_json::Value>(builder).await.map(|_| ())
    }

    // =========================================================================
    // Liveness
    // =========================================================================

    /// `GET /ping` - server liveness check.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or unhealthy.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), ApiError> {
        let url = self.endpoint("ping", None)?;
        self.request_ack(self.inner.client.get(url)).await
    }

    // =========================================================================
    // Auth & Account
    // =========================================================================

    /// `POST /tokens` - login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Response` with the server's message on bad
    /// credentials or unknown accounts.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AccessToken, ApiError> {
        let url = self.endpoint("tokens", None)?;
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        self.request(self.inner.client.post(url).json(&body)).await
    }

    /// `POST /users` - create an account and receive a token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Response` (409) when the email is already taken.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn signup(
        &self,
        email: &Email,
        name: &str,
        password: &SecretString,
    ) -> Result<AccessToken, ApiError> {
        let url = self.endpoint("users", None)?;
        let body = serde_json::json!({
            "email": email,
            "name": name,
            "password": password.expose_secret(),
        });
        self.request(self.inner.client.post(url).json(&body)).await
    }

    /// `GET /users?email=` - fetch the profile (and server cart) behind a token.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized `ApiError::Response` when the token is
    /// expired or unknown.
    #[instrument(skip(self, token), fields(email = %token.email))]
    pub async fn fetch_user(&self, token: &AccessToken) -> Result<UserProfile, ApiError> {
        let url = self.endpoint("users", Some(&token.email))?;
        self.request(self.inner.client.get(url).bearer_auth(&token.id))
            .await
    }

    /// `PUT /users?email=` - update profile fields and/or password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Response` if the server rejects the update.
    #[instrument(skip(self, token, update), fields(email = %token.email))]
    pub async fn update_user(
        &self,
        token: &AccessToken,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ApiError> {
        let url = self.endpoint("users", Some(&token.email))?;
        let mut body = serde_json::Map::new();
        if let Some(name) = &update.name {
            body.insert("name".to_string(), serde_json::Value::String(name.clone()));
        }
        if let Some(password) = &update.password {
            body.insert(
                "password".to_string(),
                serde_json::Value::String(password.expose_secret().to_string()),
            );
        }
        self.request(
            self.inner
                .client
                .put(url)
                .bearer_auth(&token.id)
                .json(&serde_json::Value::Object(body)),
        )
        .await
    }

    /// `DELETE /users?email=` - delete the account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Response` if the server refuses the deletion.
    #[instrument(skip(self, token), fields(email = %token.email))]
    pub async fn delete_account(&self, token: &AccessToken) -> Result<(), ApiError> {
        let url = self.endpoint("users", Some(&token.email))?;
        self.request_ack(self.inner.client.delete(url).bearer_auth(&token.id))
            .await
    }

    /// `DELETE /tokens?email=` - invalidate the token server-side.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Response` if the server cannot invalidate it.
    #[instrument(skip(self, token), fields(email = %token.email))]
    pub async fn logout(&self, token: &AccessToken) -> Result<(), ApiError> {
        let url = self.endpoint("tokens", Some(&token.email))?;
        self.request_ack(self.inner.client.delete(url).bearer_auth(&token.id))
            .await
    }

    // =========================================================================
    // Cart & Menu
    // =========================================================================

    /// `PUT /order?email=` - save the cart server-side.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Response` if the server rejects the cart.
    #[instrument(skip(self, token, entries), fields(email = %token.email))]
    pub async fn save_cart(
        &self,
        token: &AccessToken,
        entries: &CartEntries,
    ) -> Result<(), ApiError> {
        let url = self.endpoint("order", Some(&token.email))?;
        self.request_ack(
            self.inner
                .client
                .put(url)
                .bearer_auth(&token.id)
                .json(entries),
        )
        .await
    }

    /// `DELETE /order?email=` - clear the server-side cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Response` on server failure.
    #[instrument(skip(self, token), fields(email = %token.email))]
    pub async fn clear_cart(&self, token: &AccessToken) -> Result<(), ApiError> {
        let url = self.endpoint("order", Some(&token.email))?;
        self.request_ack(self.inner.client.delete(url).bearer_auth(&token.id))
            .await
    }

    /// `GET /order/menu?email=` - fetch the menu, served from cache when warm.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the fetch fails and nothing is cached.
    #[instrument(skip(self, token), fields(email = %token.email))]
    pub async fn fetch_menu(&self, token: &AccessToken) -> Result<Arc<Vec<MenuItem>>, ApiError> {
        let cache_key = format!("menu:{}", token.email);

        if let Some(menu) = self.inner.menu_cache.get(&cache_key).await {
            debug!("Cache hit for menu");
            return Ok(menu);
        }

        let url = self.endpoint("order/menu", Some(&token.email))?;
        let items: Vec<MenuItem> = self
            .request(self.inner.client.get(url).bearer_auth(&token.id))
            .await?;

        let menu = Arc::new(items);
        self.inner.menu_cache.insert(cache_key, menu.clone()).await;
        Ok(menu)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// `POST /order/checkout?email=` - create or refresh a payment intent.
    ///
    /// The client-computed total is sent for reconciliation; the returned
    /// amount is authoritative.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Response` if the server cannot issue an intent.
    #[instrument(skip(self, token), fields(email = %token.email))]
    pub async fn create_checkout_intent(
        &self,
        token: &AccessToken,
        client_total: Decimal,
    ) -> Result<CheckoutIntent, ApiError> {
        let url = self.endpoint("order/checkout", Some(&token.email))?;
        let body = serde_json::json!({ "cartTotal": client_total });
        self.request(
            self.inner
                .client
                .post(url)
                .bearer_auth(&token.id)
                .json(&body),
        )
        .await
    }

    /// `POST /order/checkout/complete?email=` - finalize the order after the
    /// gateway confirms payment.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Response` if the server cannot finalize.
    #[instrument(skip(self, token), fields(email = %token.email))]
    pub async fn finalize_order(&self, token: &AccessToken) -> Result<(), ApiError> {
        let url = self.endpoint("order/checkout/complete", Some(&token.email))?;
        self.request_ack(self.inner.client.post(url).bearer_auth(&token.id))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_client() -> OrderApiClient {
        let config = ClientConfig {
            server_url: "https://orders.example.com/api/".parse().unwrap(),
            order_limit: 50,
            sync_debounce: Duration::from_millis(800),
            menu_ttl: Duration::from_secs(300),
            data_dir: std::env::temp_dir(),
            sentry_dsn: None,
        };
        OrderApiClient::new(&config)
    }

    #[test]
    fn test_endpoint_without_email() {
        let client = test_client();
        let url = client.endpoint("ping", None).unwrap();
        assert_eq!(url.as_str(), "https://orders.example.com/api/ping");
    }

    #[test]
    fn test_endpoint_appends_email_query() {
        let client = test_client();
        let email = Email::parse("diner+tag@example.com").unwrap();
        let url = client.endpoint("order/menu", Some(&email)).unwrap();
        assert_eq!(url.path(), "/api/order/menu");
        assert_eq!(
            url.query_pairs().next().unwrap(),
            ("email".into(), "diner+tag@example.com".into())
        );
    }
}
