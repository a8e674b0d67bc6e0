/// In-memory payment provider
///
/// Returns deterministic intents and keeps every request for inspection.
/// Can be switched into a failing mode to exercise provider errors.

use super::{PaymentIntent, PaymentIntentRequest, PaymentProvider, ProviderError};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockPaymentProvider {
    requests: Mutex<Vec<PaymentIntentRequest>>,
    fail: bool,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that rejects every request
    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn requests(&self) -> Vec<PaymentIntentRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, ProviderError> {
        if self.fail {
            return Err(ProviderError::Rejected {
                status: 402,
                message: "card_declined".to_string(),
            });
        }

        let id = format!("pi_mock_{}", request.account_id.simple());
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        Ok(PaymentIntent {
            client_secret: format!("{}_secret", id),
            id,
        })
    }
}
