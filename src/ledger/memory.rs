// src/ledger/memory.rs

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Account, PaymentRecord, PaymentStatus, Project, ProjectDraft};

use super::{
    signup_order_id, CompletionOutcome, LedgerStore, NEW_ACCOUNT_FREE_CREDITS, SIGNUP_PROVIDER,
};

/// In-memory ledger for tests and local development. Per-account atomicity
/// comes from DashMap's entry-level locks; the only method touching both maps
/// is `complete_payment_and_credit`, which always locks payments before
/// accounts.
#[derive(Default)]
pub struct MemoryLedger {
    accounts: DashMap<Uuid, Account>,
    /// Keyed by order id, mirroring the unique index on the table.
    payments: DashMap<String, PaymentRecord>,
    projects: DashMap<Uuid, Project>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn payment_record(
    account_id: Uuid,
    amount: &str,
    credits: i32,
    provider: &str,
    order_id: String,
    status: PaymentStatus,
) -> PaymentRecord {
    let now = Utc::now();
    PaymentRecord {
        id: Uuid::new_v4(),
        account_id,
        amount: amount.to_string(),
        credits,
        order_id: Some(order_id),
        provider: provider.to_string(),
        status,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn ensure_account(&self, id: Uuid, email: &str) -> AppResult<Account> {
        let account = match self.accounts.entry(id) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(e) => {
                let now = Utc::now();
                e.insert(Account {
                    id,
                    email: email.to_string(),
                    credits: NEW_ACCOUNT_FREE_CREDITS,
                    created_at: now,
                    updated_at: now,
                })
                .clone()
            }
        };
        // Entry guard is dropped before touching payments.
        self.payments
            .entry(signup_order_id(id))
            .or_insert_with(|| {
                payment_record(
                    id,
                    "0.00",
                    NEW_ACCOUNT_FREE_CREDITS,
                    SIGNUP_PROVIDER,
                    signup_order_id(id),
                    PaymentStatus::Completed,
                )
            });
        Ok(account)
    }

    async fn get_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn credit(&self, id: Uuid, delta: i32) -> AppResult<i32> {
        if delta <= 0 {
            return Err(AppError::Validation("credit delta must be positive".into()));
        }
        let mut account = self.accounts.get_mut(&id).ok_or(AppError::NotFound)?;
        account.credits += delta;
        account.updated_at = Utc::now();
        Ok(account.credits)
    }

    async fn debit(&self, id: Uuid, delta: i32) -> AppResult<i32> {
        if delta <= 0 {
            return Err(AppError::Validation("debit delta must be positive".into()));
        }
        let mut account = self.accounts.get_mut(&id).ok_or(AppError::NotFound)?;
        if account.credits < delta {
            return Err(AppError::InsufficientFunds);
        }
        account.credits -= delta;
        account.updated_at = Utc::now();
        Ok(account.credits)
    }

    async fn create_pending_payment(
        &self,
        account_id: Uuid,
        amount: &str,
        credits: i32,
        provider: &str,
        order_id: Option<&str>,
    ) -> AppResult<PaymentRecord> {
        let record_id = Uuid::new_v4();
        let order_id = order_id
            .map(str::to_string)
            .unwrap_or_else(|| record_id.to_string());
        match self.payments.entry(order_id.clone()) {
            Entry::Occupied(_) => Err(AppError::Validation(format!(
                "duplicate order id '{order_id}'"
            ))),
            Entry::Vacant(e) => {
                let now = Utc::now();
                let record = PaymentRecord {
                    id: record_id,
                    account_id,
                    amount: amount.to_string(),
                    credits,
                    order_id: Some(order_id),
                    provider: provider.to_string(),
                    status: PaymentStatus::Pending,
                    created_at: now,
                    updated_at: now,
                };
                e.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn find_payment_by_order_id(
        &self,
        order_id: &str,
    ) -> AppResult<Option<PaymentRecord>> {
        Ok(self.payments.get(order_id).map(|p| p.clone()))
    }

    async fn complete_payment_and_credit(
        &self,
        order_id: &str,
        account_id: Uuid,
        amount: &str,
        credits: i32,
        provider: &str,
    ) -> AppResult<CompletionOutcome> {
        // Holding the payment entry while crediting makes the pair atomic
        // with respect to a concurrent duplicate notification.
        let mut entry = self.payments.entry(order_id.to_string());
        match entry {
            Entry::Occupied(ref mut e) => {
                if e.get().status == PaymentStatus::Completed {
                    return Ok(CompletionOutcome::AlreadyApplied);
                }
                let record = e.get_mut();
                record.status = PaymentStatus::Completed;
                record.updated_at = Utc::now();
            }
            Entry::Vacant(e) => {
                e.insert(payment_record(
                    account_id,
                    amount,
                    credits,
                    provider,
                    order_id.to_string(),
                    PaymentStatus::Completed,
                ));
            }
        }

        let mut account = self.accounts.get_mut(&account_id).ok_or(AppError::NotFound)?;
        account.credits += credits;
        account.updated_at = Utc::now();
        Ok(CompletionOutcome::Applied {
            new_balance: account.credits,
        })
    }

    async fn insert_project(&self, account_id: Uuid, draft: &ProjectDraft) -> AppResult<Project> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            account_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            step1_data: draft.step1_data.clone(),
            step2_data: draft.step2_data.clone(),
            documents: draft.documents.clone(),
            status: draft.status.clone(),
            created_at: now,
            updated_at: now,
        };
        self.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: Uuid,
        account_id: Uuid,
        draft: &ProjectDraft,
    ) -> AppResult<Project> {
        let mut project = self.projects.get_mut(&id).ok_or(AppError::NotFound)?;
        if project.account_id != account_id {
            return Err(AppError::NotFound);
        }
        project.title = draft.title.clone();
        project.description = draft.description.clone();
        project.step1_data = draft.step1_data.clone();
        project.step2_data = draft.step2_data.clone();
        project.documents = draft.documents.clone();
        project.status = draft.status.clone();
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn get_project(&self, id: Uuid, account_id: Uuid) -> AppResult<Option<Project>> {
        Ok(self
            .projects
            .get(&id)
            .filter(|p| p.account_id == account_id)
            .map(|p| p.clone()))
    }

    async fn list_projects(&self, account_id: Uuid) -> AppResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .iter()
            .filter(|p| p.account_id == account_id)
            .map(|p| p.clone())
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }
}
