//! Checkout coordinator and payment gateway seam.
//!
//! Checkout is a small state machine:
//!
//! ```text
//! Loading ──> ReadyToPay ──> Processing ──> Succeeded
//!    │                           │
//!    └──────> Failed <───────────┘
//!                │ retry
//!                └──> Loading
//! ```
//!
//! The server-issued intent amount is authoritative for display and for the
//! charge, even when it differs from the client-computed total. The payment
//! provider's SDK sits behind [`PaymentGateway`] and is never reimplemented
//! here; card details live outside the machine so a retry does not lose
//! them.

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, instrument, warn};

use tableside_core::{AccessToken, display_usd};

use crate::api::types::CheckoutIntent;
use crate::api::{ApiError, OrderApiClient};
use crate::cart::{CartError, CartStore};

/// Card details collected by the (out-of-scope) UI layer.
///
/// Implements `Debug` manually to redact the number and security code.
#[derive(Clone)]
pub struct CardDetails {
    /// Primary account number.
    pub number: SecretString,
    /// Expiration month, 1-12.
    pub exp_month: u8,
    /// Expiration year, four digits.
    pub exp_year: u16,
    /// Card security code.
    pub cvc: SecretString,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &"[REDACTED]")
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &"[REDACTED]")
            .finish()
    }
}

/// Opaque error surfaced by the payment provider.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct PaymentError {
    /// Provider-defined error type (e.g., `card_error`).
    pub kind: String,
    /// Provider-supplied message, shown verbatim in the alert region.
    pub message: String,
}

/// The payment provider's SDK, as consumed by the checkout flow.
///
/// External collaborator with a fixed call contract; implementations wrap
/// the real SDK, tests substitute a mock.
pub trait PaymentGateway {
    /// Whether the SDK has finished initializing. Pay is only enabled once
    /// this reports true.
    fn is_initialized(&self) -> bool;

    /// Tokenize card details into a provider-side payment method.
    fn create_payment_method(
        &self,
        card: &CardDetails,
    ) -> impl Future<Output = Result<String, PaymentError>> + Send;

    /// Confirm the charge authorized by `client_secret`.
    fn confirm_card_payment(
        &self,
        client_secret: &str,
        card: &CardDetails,
    ) -> impl Future<Output = Result<(), PaymentError>> + Send;
}

/// Errors from driving the checkout flow incorrectly or from collaborators.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// An action was attempted from a state that does not permit it.
    #[error("Cannot {action} from checkout state {from}")]
    InvalidTransition {
        /// State the machine was in.
        from: &'static str,
        /// Action that was attempted.
        action: &'static str,
    },

    /// Pay was attempted before the payment SDK finished initializing.
    #[error("Payment gateway not initialized")]
    GatewayNotReady,

    /// Order server call failed outside the Loading state (finalize).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Clearing the cart after a successful order failed.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Where the checkout flow currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    /// Fetching or refreshing the payment intent.
    Loading,
    /// Intent in hand; waiting for the pay action.
    ReadyToPay {
        /// Server-issued intent secret.
        client_secret: String,
        /// Server-authoritative total.
        amount: Decimal,
    },
    /// Confirmation in flight with the gateway.
    Processing {
        /// Server-issued intent secret.
        client_secret: String,
        /// Server-authoritative total.
        amount: Decimal,
    },
    /// Payment confirmed.
    Succeeded,
    /// Intent fetch or payment failed; retry re-enters Loading.
    Failed {
        /// Message for the alert region.
        message: String,
    },
}

impl CheckoutState {
    const fn name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::ReadyToPay { .. } => "ReadyToPay",
            Self::Processing { .. } => "Processing",
            Self::Succeeded => "Succeeded",
            Self::Failed { .. } => "Failed",
        }
    }
}

/// Drives a single checkout attempt from intent fetch to finalization.
#[derive(Debug)]
pub struct CheckoutCoordinator {
    state: CheckoutState,
}

impl Default for CheckoutCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutCoordinator {
    /// Start a checkout in the Loading state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: CheckoutState::Loading,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// The total to display, once known: always the server's amount.
    #[must_use]
    pub fn displayed_total(&self) -> Option<String> {
        match &self.state {
            CheckoutState::ReadyToPay { amount, .. }
            | CheckoutState::Processing { amount, .. } => Some(display_usd(*amount)),
            _ => None,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Record a fetched intent: Loading → ReadyToPay.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` outside Loading.
    pub fn intent_loaded(&mut self, intent: CheckoutIntent) -> Result<(), CheckoutError> {
        match self.state {
            CheckoutState::Loading => {
                self.state = CheckoutState::ReadyToPay {
                    client_secret: intent.client_secret,
                    amount: intent.amount,
                };
                Ok(())
            }
            _ => Err(self.invalid("load an intent")),
        }
    }

    /// Record an intent fetch failure: Loading → Failed.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` outside Loading.
    pub fn intent_failed(&mut self, message: String) -> Result<(), CheckoutError> {
        match self.state {
            CheckoutState::Loading => {
                self.state = CheckoutState::Failed { message };
                Ok(())
            }
            _ => Err(self.invalid("fail an intent fetch")),
        }
    }

    /// Re-enter Loading after a failure: Failed → Loading.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` outside Failed.
    pub fn retry(&mut self) -> Result<(), CheckoutError> {
        match self.state {
            CheckoutState::Failed { .. } => {
                self.state = CheckoutState::Loading;
                Ok(())
            }
            _ => Err(self.invalid("retry")),
        }
    }

    fn begin_processing(&mut self) -> Result<(String, Decimal), CheckoutError> {
        match &self.state {
            CheckoutState::ReadyToPay {
                client_secret,
                amount,
            } => {
                let (client_secret, amount) = (client_secret.clone(), *amount);
                self.state = CheckoutState::Processing {
                    client_secret: client_secret.clone(),
                    amount,
                };
                Ok((client_secret, amount))
            }
            _ => Err(self.invalid("pay")),
        }
    }

    fn invalid(&self, action: &'static str) -> CheckoutError {
        CheckoutError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }

    // =========================================================================
    // Drivers
    // =========================================================================

    /// Fetch or refresh the payment intent from the server.
    ///
    /// A client/server total mismatch is logged; the server total wins. An
    /// intent fetch failure lands in `Failed` rather than erroring, since
    /// the UI offers retry from that state.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` if called outside Loading.
    #[instrument(skip(self, api, token))]
    pub async fn load(
        &mut self,
        api: &OrderApiClient,
        token: &AccessToken,
        client_total: Decimal,
    ) -> Result<&CheckoutState, CheckoutError> {
        if !matches!(self.state, CheckoutState::Loading) {
            return Err(self.invalid("load"));
        }

        match api.create_checkout_intent(token, client_total).await {
            Ok(intent) => {
                if intent.amount != client_total {
                    warn!(
                        client_total = %client_total,
                        server_total = %intent.amount,
                        "Client total differs from server total; server wins"
                    );
                }
                self.intent_loaded(intent)?;
            }
            Err(e) => {
                self.intent_failed(e.to_string())?;
            }
        }
        Ok(&self.state)
    }

    /// Confirm the payment through the gateway.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::GatewayNotReady` before SDK initialization
    /// and `CheckoutError::InvalidTransition` outside ReadyToPay. A gateway
    /// decline is not an error: it lands in `Failed` with the provider's
    /// message.
    #[instrument(skip(self, gateway, card))]
    pub async fn pay<G: PaymentGateway>(
        &mut self,
        gateway: &G,
        card: &CardDetails,
    ) -> Result<&CheckoutState, CheckoutError> {
        if !gateway.is_initialized() {
            return Err(CheckoutError::GatewayNotReady);
        }

        let (client_secret, amount) = self.begin_processing()?;

        match gateway.confirm_card_payment(&client_secret, card).await {
            Ok(()) => {
                info!(amount = %amount, "Payment confirmed");
                self.state = CheckoutState::Succeeded;
            }
            Err(e) => {
                warn!(error = %e, "Payment declined by gateway");
                self.state = CheckoutState::Failed {
                    message: e.message,
                };
            }
        }
        Ok(&self.state)
    }

    /// Finalize the order server-side and clear the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` outside Succeeded and
    /// propagates server/cart failures.
    #[instrument(skip(self, api, token, cart))]
    pub async fn finalize(
        &self,
        api: &OrderApiClient,
        token: &AccessToken,
        cart: &mut CartStore,
    ) -> Result<(), CheckoutError> {
        if !matches!(self.state, CheckoutState::Succeeded) {
            return Err(self.invalid("finalize"));
        }

        api.finalize_order(token).await?;
        cart.clear()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn intent(secret: &str, amount: &str) -> CheckoutIntent {
        CheckoutIntent {
            client_secret: secret.to_string(),
            amount: amount.parse().unwrap(),
        }
    }

    fn card() -> CardDetails {
        CardDetails {
            number: SecretString::from("4242424242424242"),
            exp_month: 12,
            exp_year: 2030,
            cvc: SecretString::from("123"),
        }
    }

    /// Gateway double with a scripted confirmation outcome.
    struct MockGateway {
        initialized: bool,
        outcome: Result<(), PaymentError>,
        confirmations: AtomicUsize,
    }

    impl MockGateway {
        fn succeeding() -> Self {
            Self {
                initialized: true,
                outcome: Ok(()),
                confirmations: AtomicUsize::new(0),
            }
        }

        fn declining(message: &str) -> Self {
            Self {
                initialized: true,
                outcome: Err(PaymentError {
                    kind: "card_error".to_string(),
                    message: message.to_string(),
                }),
                confirmations: AtomicUsize::new(0),
            }
        }

        fn uninitialized() -> Self {
            Self {
                initialized: false,
                outcome: Ok(()),
                confirmations: AtomicUsize::new(0),
            }
        }
    }

    impl PaymentGateway for MockGateway {
        fn is_initialized(&self) -> bool {
            self.initialized
        }

        async fn create_payment_method(&self, _card: &CardDetails) -> Result<String, PaymentError> {
            Ok("pm_mock".to_string())
        }

        async fn confirm_card_payment(
            &self,
            _client_secret: &str,
            _card: &CardDetails,
        ) -> Result<(), PaymentError> {
            self.confirmations.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    #[test]
    fn test_displayed_total_is_server_amount() {
        let mut checkout = CheckoutCoordinator::new();
        assert!(checkout.displayed_total().is_none());

        // Server says $31.25 even if the client computed something else
        checkout.intent_loaded(intent("pi_secret", "31.25")).unwrap();
        assert_eq!(checkout.displayed_total().as_deref(), Some("$31.25"));
    }

    #[test]
    fn test_pay_before_load_is_rejected() {
        let mut checkout = CheckoutCoordinator::new();
        let err = checkout.begin_processing().unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidTransition {
                from: "Loading",
                ..
            }
        ));
    }

    #[test]
    fn test_retry_only_from_failed() {
        let mut checkout = CheckoutCoordinator::new();
        assert!(checkout.retry().is_err());

        checkout.intent_failed("server unreachable".to_string()).unwrap();
        checkout.retry().unwrap();
        assert_eq!(*checkout.state(), CheckoutState::Loading);
    }

    #[tokio::test]
    async fn test_pay_success_transitions_to_succeeded() {
        let mut checkout = CheckoutCoordinator::new();
        checkout.intent_loaded(intent("pi_secret", "20.00")).unwrap();

        let gateway = MockGateway::succeeding();
        let state = checkout.pay(&gateway, &card()).await.unwrap();

        assert_eq!(*state, CheckoutState::Succeeded);
        assert_eq!(gateway.confirmations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pay_decline_carries_gateway_message_and_allows_retry() {
        let mut checkout = CheckoutCoordinator::new();
        checkout.intent_loaded(intent("pi_secret", "20.00")).unwrap();

        let gateway = MockGateway::declining("Your card was declined.");
        let state = checkout.pay(&gateway, &card()).await.unwrap();

        assert_eq!(
            *state,
            CheckoutState::Failed {
                message: "Your card was declined.".to_string()
            }
        );

        // Retry re-enters Loading; the card details object is untouched and
        // can be resubmitted after the intent refresh.
        checkout.retry().unwrap();
        assert_eq!(*checkout.state(), CheckoutState::Loading);
    }

    #[tokio::test]
    async fn test_pay_requires_initialized_gateway() {
        let mut checkout = CheckoutCoordinator::new();
        checkout.intent_loaded(intent("pi_secret", "20.00")).unwrap();

        let gateway = MockGateway::uninitialized();
        let err = checkout.pay(&gateway, &card()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::GatewayNotReady));

        // The machine did not move; pay is still possible once the SDK is up
        assert!(matches!(
            checkout.state(),
            CheckoutState::ReadyToPay { .. }
        ));
    }

    #[test]
    fn test_double_intent_load_is_rejected() {
        let mut checkout = CheckoutCoordinator::new();
        checkout.intent_loaded(intent("pi_secret", "20.00")).unwrap();
        assert!(checkout.intent_loaded(intent("pi_other", "21.00")).is_err());
    }

    #[test]
    fn test_card_details_debug_redacts() {
        let debug_output = format!("{:?}", card());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("4242424242424242"));
        assert!(!debug_output.contains("123"));
    }
}
