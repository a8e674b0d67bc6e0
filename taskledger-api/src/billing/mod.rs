/// Payment provider integration
///
/// Credit purchases start with a payment intent created at the provider. The
/// provider later reports the outcome through the webhook, which is settled
/// by [`taskledger_shared::payments::settlement`].
///
/// - `stripe`: HTTPS client for the real provider
/// - `mock`: in-memory provider that records requests

pub mod mock;
pub mod stripe;

pub use mock::MockPaymentProvider;
pub use stripe::StripeClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Price of one credit in cents (USD)
pub const CENTS_PER_CREDIT: i64 = 50;

/// Smallest purchasable amount of credits
pub const MIN_PURCHASE_CREDITS: i32 = 1;

/// Total charge for a credit purchase
pub fn price_in_cents(credits: i32) -> i64 {
    i64::from(credits) * CENTS_PER_CREDIT
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No API key configured
    #[error("Payment provider is not configured")]
    NotConfigured,

    /// Network failure or timeout
    #[error("Payment provider request failed: {0}")]
    RequestFailed(String),

    /// Provider answered with an error
    #[error("Payment provider error ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid payment provider response: {0}")]
    InvalidResponse(String),
}

/// Intent parameters sent to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    pub account_id: Uuid,
    pub credits: i32,
    pub amount_cents: i64,
}

impl PaymentIntentRequest {
    pub fn for_credits(account_id: Uuid, credits: i32) -> Self {
        Self {
            account_id,
            credits,
            amount_cents: price_in_cents(credits),
        }
    }
}

/// Intent created at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,

    /// Handed to the browser to confirm the payment
    pub client_secret: String,
}

/// Creates payment intents
///
/// The intent carries `user_id` and `credits` metadata so the webhook can
/// credit the right account once the payment succeeds.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, ProviderError>;
}
