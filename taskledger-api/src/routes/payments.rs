/// Credit purchase endpoints
///
/// - `POST /api/subscriptions/purchase` - Create a payment intent (bearer)
/// - `POST /api/webhook` - Provider callback (signed)
///
/// The purchase call only creates the intent. Credits are added when the
/// provider reports `payment_intent.succeeded` through the webhook, once per
/// event id.

use crate::{
    app::AppState,
    billing::{PaymentIntentRequest, MIN_PURCHASE_CREDITS},
    error::{ApiError, ApiResult},
};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use taskledger_shared::{
    auth::middleware::AuthContext,
    models::account::Account,
    payments::{
        settlement::PaymentEvent,
        signature::{verify_signature, SignatureError, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER},
    },
};

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Number of credits to buy
    pub credits: i32,
}

/// Creates a payment intent priced at 50 cents per credit
///
/// # Errors
///
/// - `400 Bad Request`: fewer than one credit
/// - `502 Bad Gateway`: provider rejected or unreachable
/// - `503 Service Unavailable`: provider not configured
pub async fn purchase(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<PurchaseRequest>,
) -> ApiResult<Json<Value>> {
    if req.credits < MIN_PURCHASE_CREDITS {
        return Err(ApiError::BadRequest("Minimum purchase is 1 credit".to_string()));
    }

    let account = Account::find_by_id(&state.db, auth.account_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    let intent = state
        .payments
        .create_payment_intent(PaymentIntentRequest::for_credits(account.id, req.credits))
        .await?;

    tracing::debug!(
        account_id = %account.id,
        credits = req.credits,
        provider = state.payments.name(),
        intent_id = %intent.id,
        "Purchase started"
    );

    Ok(Json(json!({ "clientSecret": intent.client_secret })))
}

/// Receives provider events
///
/// The signature is checked against the raw body before anything is parsed.
/// After that the provider always gets `200 {"status":"success"}`; duplicate,
/// ignored and failed settlements are only logged.
///
/// # Errors
///
/// - `401 Unauthorized`: missing, stale or wrong signature
/// - `400 Bad Request`: signed body is not an event
/// - `413 Payload Too Large`: body over 64 KiB
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::Missing)?;

    verify_signature(
        signature,
        &body,
        &state.config.stripe.webhook_secret,
        chrono::Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook delivery");
        e
    })?;

    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Error parsing webhook JSON".to_string()))?;

    let outcome = state.settlement.handle_event(&event).await;
    tracing::info!(event_id = %event.id, outcome = ?outcome, "Webhook processed");

    Ok(Json(json!({ "status": "success" })))
}
