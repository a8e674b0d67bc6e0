/// Stripe REST client
///
/// Only payment intent creation is needed. Requests are form encoded and
/// authenticated with the secret key as a bearer token.

use super::{PaymentIntent, PaymentIntentRequest, PaymentProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: Option<String>,
}

impl StripeClient {
    pub fn new(api_base: impl Into<String>, secret_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    fn intent_form(request: &PaymentIntentRequest) -> Vec<(&'static str, String)> {
        vec![
            ("amount", request.amount_cents.to_string()),
            ("currency", "usd".to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[user_id]", request.account_id.to_string()),
            ("metadata[credits]", request.credits.to_string()),
        ]
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, ProviderError> {
        let secret_key = self.secret_key.as_deref().ok_or(ProviderError::NotConfigured)?;
        let url = format!("{}/v1/payment_intents", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(secret_key)
            .form(&Self::intent_form(&request))
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let intent: IntentResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| ProviderError::InvalidResponse("missing client_secret".to_string()))?;

        tracing::info!(
            intent_id = %intent.id,
            account_id = %request.account_id,
            credits = request.credits,
            "Payment intent created"
        );

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }
}
