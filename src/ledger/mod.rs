// src/ledger/mod.rs
//
// Durable credit ledger. The trait keeps handlers storage-agnostic: Postgres
// in production, an in-memory DashMap store for tests and local dev. Both
// implementations serialize credit/debit per account; handler code must never
// read-then-write a balance on its own.

mod memory;
mod pg;

pub use memory::MemoryLedger;
pub use pg::PgLedger;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Account, PaymentRecord, Project, ProjectDraft};

/// Credits granted to every account on first contact, recorded as a
/// synthetic completed payment (provider "signup") for auditability.
pub const NEW_ACCOUNT_FREE_CREDITS: i32 = 2;

pub const SIGNUP_PROVIDER: &str = "signup";

pub fn signup_order_id(account_id: Uuid) -> String {
    format!("signup:{account_id}")
}

/// Outcome of the atomic mark-completed-and-credit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied { new_balance: i32 },
    AlreadyApplied,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create-if-absent, idempotent on id. New accounts get the free grant.
    async fn ensure_account(&self, id: Uuid, email: &str) -> AppResult<Account>;

    async fn get_account(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Returns the new balance.
    async fn credit(&self, id: Uuid, delta: i32) -> AppResult<i32>;

    /// Returns the new balance, or `AppError::InsufficientFunds` leaving the
    /// balance unchanged. Check and mutation are one atomic unit per account.
    async fn debit(&self, id: Uuid, delta: i32) -> AppResult<i32>;

    /// `order_id = None` assigns the record's own id as its order id, so the
    /// redirect-pay flow can hand it to the provider as `out_trade_no`.
    async fn create_pending_payment(
        &self,
        account_id: Uuid,
        amount: &str,
        credits: i32,
        provider: &str,
        order_id: Option<&str>,
    ) -> AppResult<PaymentRecord>;

    async fn find_payment_by_order_id(&self, order_id: &str)
        -> AppResult<Option<PaymentRecord>>;

    /// Marks (or creates) the payment record for `order_id` as completed and
    /// credits the account, as a single atomic unit. A record already
    /// completed yields `AlreadyApplied` with no mutation.
    async fn complete_payment_and_credit(
        &self,
        order_id: &str,
        account_id: Uuid,
        amount: &str,
        credits: i32,
        provider: &str,
    ) -> AppResult<CompletionOutcome>;

    async fn insert_project(&self, account_id: Uuid, draft: &ProjectDraft) -> AppResult<Project>;

    /// `NotFound` when the project does not exist or belongs to someone else.
    async fn update_project(
        &self,
        id: Uuid,
        account_id: Uuid,
        draft: &ProjectDraft,
    ) -> AppResult<Project>;

    async fn get_project(&self, id: Uuid, account_id: Uuid) -> AppResult<Option<Project>>;

    async fn list_projects(&self, account_id: Uuid) -> AppResult<Vec<Project>>;
}
