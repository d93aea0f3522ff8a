// src/settlement.rs
//
// Exactly-once settlement. Payment adapters (checkout webhook, redirect-pay
// callback, dev recharge) normalize whatever their provider sends into a
// SettlementEvent; settle() is the only path that turns money into credits.

use log::info;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;
use crate::ledger::{CompletionOutcome, LedgerStore};
use crate::models::PaymentStatus;

/// A verified, provider-agnostic "money arrived" fact.
#[derive(Debug, Clone)]
pub struct SettlementEvent {
    pub account_id: Uuid,
    pub email: String,
    pub credits: i32,
    /// External order id; the idempotency key across retries and duplicates.
    pub order_id: String,
    pub amount: String,
    pub provider: &'static str,
    /// Raw provider payload, kept for audit logging only.
    pub raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Applied { new_balance: i32 },
    AlreadyApplied,
}

/// Applies a settlement event at most once. Safe to call any number of times
/// with the same order id; only the first call moves the balance.
pub async fn settle(
    store: &dyn LedgerStore,
    event: SettlementEvent,
) -> AppResult<SettlementOutcome> {
    // Cheap duplicate short-circuit before touching the account.
    if let Some(existing) = store.find_payment_by_order_id(&event.order_id).await? {
        if existing.status == PaymentStatus::Completed {
            info!(
                "settlement: order {} already applied, ignoring duplicate from {}",
                event.order_id, event.provider
            );
            return Ok(SettlementOutcome::AlreadyApplied);
        }
    }

    store.ensure_account(event.account_id, &event.email).await?;

    let outcome = store
        .complete_payment_and_credit(
            &event.order_id,
            event.account_id,
            &event.amount,
            event.credits,
            event.provider,
        )
        .await?;

    match outcome {
        CompletionOutcome::Applied { new_balance } => {
            info!(
                "settlement: order {} via {} credited {} to account {}, balance {}",
                event.order_id, event.provider, event.credits, event.account_id, new_balance
            );
            Ok(SettlementOutcome::Applied { new_balance })
        }
        CompletionOutcome::AlreadyApplied => {
            info!(
                "settlement: order {} lost the race to a concurrent duplicate",
                event.order_id
            );
            Ok(SettlementOutcome::AlreadyApplied)
        }
    }
}
