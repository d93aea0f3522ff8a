// src/ledger/pg.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Account, PaymentRecord, PaymentStatus, Project, ProjectDraft};

use super::{
    signup_order_id, CompletionOutcome, LedgerStore, NEW_ACCOUNT_FREE_CREDITS, SIGNUP_PROVIDER,
};

const PAYMENT_COLUMNS: &str = "id, account_id, amount::text AS amount, credits, order_id, \
                               provider, status, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, account_id, title, description, step1_data, step2_data, \
                               documents, status, created_at, updated_at";

#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_account(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        email: row.get("email"),
        credits: row.get("credits"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_payment(row: &PgRow) -> AppResult<PaymentRecord> {
    let status: String = row.get("status");
    let status = PaymentStatus::parse(&status)
        .ok_or_else(|| AppError::Internal(format!("unknown payment status '{status}'")))?;
    Ok(PaymentRecord {
        id: row.get("id"),
        account_id: row.get("account_id"),
        amount: row.get("amount"),
        credits: row.get("credits"),
        order_id: row.get("order_id"),
        provider: row.get("provider"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_project(row: &PgRow) -> Project {
    Project {
        id: row.get("id"),
        account_id: row.get("account_id"),
        title: row.get("title"),
        description: row.get("description"),
        step1_data: row.get("step1_data"),
        step2_data: row.get("step2_data"),
        documents: row.get("documents"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn ensure_account(&self, id: Uuid, email: &str) -> AppResult<Account> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"INSERT INTO users (id, email, credits)
               VALUES ($1, $2, $3)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(id)
        .bind(email)
        .bind(NEW_ACCOUNT_FREE_CREDITS)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 1 {
            sqlx::query(
                r#"INSERT INTO payments (id, account_id, amount, credits, order_id, provider, status)
                   VALUES ($1, $2, 0.00, $3, $4, $5, 'completed')
                   ON CONFLICT DO NOTHING"#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(NEW_ACCOUNT_FREE_CREDITS)
            .bind(signup_order_id(id))
            .bind(SIGNUP_PROVIDER)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let row = sqlx::query("SELECT id, email, credits, created_at, updated_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::Validation("email already registered to another account".into())
            })?;
        Ok(row_to_account(&row))
    }

    async fn get_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        let row = sqlx::query("SELECT id, email, credits, created_at, updated_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_account))
    }

    async fn credit(&self, id: Uuid, delta: i32) -> AppResult<i32> {
        if delta <= 0 {
            return Err(AppError::Validation("credit delta must be positive".into()));
        }
        let row = sqlx::query(
            r#"UPDATE users SET credits = credits + $2, updated_at = NOW()
               WHERE id = $1
               RETURNING credits"#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(row.get("credits")),
            None => Err(AppError::NotFound),
        }
    }

    async fn debit(&self, id: Uuid, delta: i32) -> AppResult<i32> {
        if delta <= 0 {
            return Err(AppError::Validation("debit delta must be positive".into()));
        }
        // Guard and mutation in one statement; concurrent debits on the same
        // row serialize on the row lock.
        let row = sqlx::query(
            r#"UPDATE users SET credits = credits - $2, updated_at = NOW()
               WHERE id = $1 AND credits >= $2
               RETURNING credits"#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = row {
            return Ok(row.get("credits"));
        }
        let exists = sqlx::query("SELECT 1 FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_some() {
            Err(AppError::InsufficientFunds)
        } else {
            Err(AppError::NotFound)
        }
    }

    async fn create_pending_payment(
        &self,
        account_id: Uuid,
        amount: &str,
        credits: i32,
        provider: &str,
        order_id: Option<&str>,
    ) -> AppResult<PaymentRecord> {
        let id = Uuid::new_v4();
        let order_id = order_id.map(str::to_string).unwrap_or_else(|| id.to_string());
        let row = sqlx::query(&format!(
            r#"INSERT INTO payments (id, account_id, amount, credits, order_id, provider, status)
               VALUES ($1, $2, $3::numeric, $4, $5, $6, 'pending')
               RETURNING {PAYMENT_COLUMNS}"#
        ))
        .bind(id)
        .bind(account_id)
        .bind(amount)
        .bind(credits)
        .bind(&order_id)
        .bind(provider)
        .fetch_one(&self.pool)
        .await?;
        row_to_payment(&row)
    }

    async fn find_payment_by_order_id(
        &self,
        order_id: &str,
    ) -> AppResult<Option<PaymentRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_payment).transpose()
    }

    async fn complete_payment_and_credit(
        &self,
        order_id: &str,
        account_id: Uuid,
        amount: &str,
        credits: i32,
        provider: &str,
    ) -> AppResult<CompletionOutcome> {
        // Record completion and the balance grant commit together: a crash
        // can never leave a completed record without its credits applied.
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query(
            r#"INSERT INTO payments (id, account_id, amount, credits, order_id, provider, status)
               VALUES ($1, $2, $3::numeric, $4, $5, $6, 'completed')
               ON CONFLICT (order_id) DO UPDATE
                   SET status = 'completed', updated_at = NOW()
                   WHERE payments.status <> 'completed'
               RETURNING id"#,
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(amount)
        .bind(credits)
        .bind(order_id)
        .bind(provider)
        .fetch_optional(&mut *tx)
        .await?;

        if marked.is_none() {
            // Conflict row was already completed; nothing to apply.
            tx.rollback().await?;
            return Ok(CompletionOutcome::AlreadyApplied);
        }

        let row = sqlx::query(
            r#"UPDATE users SET credits = credits + $2, updated_at = NOW()
               WHERE id = $1
               RETURNING credits"#,
        )
        .bind(account_id)
        .bind(credits)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound)?;

        let new_balance: i32 = row.get("credits");
        tx.commit().await?;
        Ok(CompletionOutcome::Applied { new_balance })
    }

    async fn insert_project(&self, account_id: Uuid, draft: &ProjectDraft) -> AppResult<Project> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO projects
                   (id, account_id, title, description, step1_data, step2_data, documents, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {PROJECT_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.step1_data)
        .bind(&draft.step2_data)
        .bind(&draft.documents)
        .bind(&draft.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_project(&row))
    }

    async fn update_project(
        &self,
        id: Uuid,
        account_id: Uuid,
        draft: &ProjectDraft,
    ) -> AppResult<Project> {
        let row = sqlx::query(&format!(
            r#"UPDATE projects
               SET title = $3, description = $4, step1_data = $5, step2_data = $6,
                   documents = $7, status = $8, updated_at = NOW()
               WHERE id = $1 AND account_id = $2
               RETURNING {PROJECT_COLUMNS}"#
        ))
        .bind(id)
        .bind(account_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.step1_data)
        .bind(&draft.step2_data)
        .bind(&draft.documents)
        .bind(&draft.status)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(row_to_project(&row)),
            None => Err(AppError::NotFound),
        }
    }

    async fn get_project(&self, id: Uuid, account_id: Uuid) -> AppResult<Option<Project>> {
        let row = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND account_id = $2"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_project))
    }

    async fn list_projects(&self, account_id: Uuid) -> AppResult<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE account_id = $1 ORDER BY created_at DESC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_project).collect())
    }
}
