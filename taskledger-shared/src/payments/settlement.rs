/// Payment settlement
///
/// Applies the provider's "payment succeeded" events to the ledger, at most
/// once per event id. Claiming the event id and crediting the account share
/// one transaction: if the credit fails, the claim is rolled back too and a
/// later redelivery can still settle.
///
/// [`SettlementAdapter::handle_event`] never returns an error. The webhook
/// endpoint always answers 200 so the provider does not retry forever;
/// anything that went wrong is reported through `tracing` at `warn` or
/// `error` level with the event id and account attached.

use crate::credits::{apply_in, Adjustment, LedgerError};
use crate::models::payment_event::ProcessedPaymentEvent;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Event type that triggers a credit grant
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Provider event envelope (only the fields settlement reads)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Event id, e.g. `evt_3O...`; the idempotency key
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEventData {
    pub object: PaymentObject,
}

/// The payment intent carried by the event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentObject {
    #[serde(default)]
    pub id: Option<String>,

    /// Set when the intent was created: `user_id` and `credits`
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// What an event asks the ledger to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditGrant {
    pub account_id: Uuid,
    pub credits: i32,
}

impl PaymentEvent {
    /// Reads the grant from the intent metadata
    ///
    /// `None` if `user_id` or `credits` is absent, unparsable, or the
    /// credit count is not positive.
    pub fn credit_grant(&self) -> Option<CreditGrant> {
        let metadata = &self.data.object.metadata;
        let account_id = metadata.get("user_id")?.trim().parse::<Uuid>().ok()?;
        let credits = metadata.get("credits")?.trim().parse::<i32>().ok()?;

        if credits <= 0 {
            return None;
        }

        Some(CreditGrant {
            account_id,
            credits,
        })
    }
}

/// How an event was handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Credits were added
    Applied {
        account_id: Uuid,
        credits: i32,
        new_balance: i32,
    },

    /// The event id was settled before; nothing changed
    Duplicate,

    /// Not a settleable event (other type or missing metadata)
    Ignored { reason: String },

    /// Crediting failed and was rolled back
    Failed { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Idempotent bridge from provider events to the ledger
#[derive(Debug, Clone)]
pub struct SettlementAdapter {
    db: PgPool,
}

impl SettlementAdapter {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Credits `credits` to `account_id` once per `event_id`
    ///
    /// # Errors
    ///
    /// Ledger or database failures; the transaction is rolled back and the
    /// event id stays unclaimed.
    pub async fn settle(
        &self,
        event_id: &str,
        account_id: Uuid,
        credits: i32,
    ) -> Result<SettlementOutcome, SettlementError> {
        let mut tx = self.db.begin().await?;

        if !ProcessedPaymentEvent::claim(&mut tx, event_id, account_id, credits).await? {
            tx.rollback().await?;
            info!(event_id, account_id = %account_id, "Payment event already settled");
            return Ok(SettlementOutcome::Duplicate);
        }

        let outcome = apply_in(&mut tx, Adjustment::purchase(account_id, credits)).await?;
        tx.commit().await?;

        info!(
            event_id,
            account_id = %account_id,
            credits,
            new_balance = outcome.new_balance,
            "Payment settled"
        );

        Ok(SettlementOutcome::Applied {
            account_id,
            credits,
            new_balance: outcome.new_balance,
        })
    }

    /// Handles a verified provider event
    ///
    /// Never fails; see the module docs.
    pub async fn handle_event(&self, event: &PaymentEvent) -> SettlementOutcome {
        if event.event_type != PAYMENT_SUCCEEDED {
            info!(event_id = %event.id, event_type = %event.event_type, "Ignoring payment event");
            return SettlementOutcome::Ignored {
                reason: format!("unhandled event type {}", event.event_type),
            };
        }

        let Some(grant) = event.credit_grant() else {
            warn!(
                event_id = %event.id,
                payment_intent = ?event.data.object.id,
                "Payment event without usable user_id/credits metadata"
            );
            return SettlementOutcome::Ignored {
                reason: "missing metadata".to_string(),
            };
        };

        match self.settle(&event.id, grant.account_id, grant.credits).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    event_id = %event.id,
                    account_id = %grant.account_id,
                    credits = grant.credits,
                    error = %e,
                    "Payment settlement failed"
                );
                SettlementOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
