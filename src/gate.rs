// src/gate.rs
//
// Generation gate. One credit buys one full document bundle; the debit lands
// only after the bundle has been produced, so a failed run costs nothing.

use log::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::generator::{DocumentSet, GenerationJob, JobRunner};
use crate::ledger::LedgerStore;

pub const GENERATION_COST: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordability {
    Sufficient { balance: i32 },
    Insufficient { balance: i32 },
}

/// Advisory balance check for the pre-generation UI. The authoritative check
/// happens inside `spend`.
pub async fn check_affordability(
    store: &dyn LedgerStore,
    account_id: Uuid,
    email: &str,
) -> AppResult<Affordability> {
    let account = store.ensure_account(account_id, email).await?;
    if account.credits >= GENERATION_COST {
        Ok(Affordability::Sufficient {
            balance: account.credits,
        })
    } else {
        Ok(Affordability::Insufficient {
            balance: account.credits,
        })
    }
}

#[derive(Debug)]
pub struct SpendResult {
    pub documents: DocumentSet,
    /// Balance after the debit.
    pub balance: i32,
}

/// Runs the job and debits one credit on success. Order matters:
/// - balance short at entry: reject before doing any work;
/// - runner fails: propagate, no debit;
/// - runner succeeds but a concurrent spend drained the balance meanwhile:
///   the debit loses and the caller gets `InsufficientFunds` without the
///   documents, keeping the balance non-negative.
pub async fn spend(
    store: &dyn LedgerStore,
    runner: &dyn JobRunner,
    job: &GenerationJob,
) -> AppResult<SpendResult> {
    let account = store.ensure_account(job.account_id, &job.email).await?;
    if account.credits < GENERATION_COST {
        info!(
            "gate: account {} has {} credits, refusing generation",
            job.account_id, account.credits
        );
        return Err(AppError::InsufficientFunds);
    }

    let documents = runner.run(job).await?;

    let balance = match store.debit(job.account_id, GENERATION_COST).await {
        Ok(balance) => balance,
        Err(AppError::InsufficientFunds) => {
            warn!(
                "gate: account {} drained during generation, discarding result",
                job.account_id
            );
            return Err(AppError::InsufficientFunds);
        }
        Err(other) => return Err(other),
    };

    info!(
        "gate: account {} spent {} credit, balance {}",
        job.account_id, GENERATION_COST, balance
    );
    Ok(SpendResult { documents, balance })
}
