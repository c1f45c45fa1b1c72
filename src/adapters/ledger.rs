use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::common::{Clock, DebitRequest, Ledger, MemberId, TenantId};
use crate::errors::{LotteryError, LotteryResult};
use crate::storage::{OptimizedStorage, StoreTransaction};
use crate::store::accounts::{self, LedgerEntry, MemberAccount};

/// Member balances kept in the lottery's own RocksDB instance.
///
/// Debits are staged into the caller's transaction; deposits and suspensions
/// are administrative and commit on their own.
pub struct StoreLedger {
    storage: Arc<OptimizedStorage>,
    clock: Arc<dyn Clock>,
}

impl StoreLedger {
    pub fn new(storage: Arc<OptimizedStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Credit a member, opening the account on first use
    pub async fn deposit(&self, tenant_id: TenantId, member_id: MemberId, amount: i64) -> LotteryResult<i64> {
        if amount <= 0 {
            return Err(LotteryError::InvalidAmount(amount));
        }

        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let mut account = accounts::load(&tx, tenant_id, member_id)?.unwrap_or(MemberAccount {
            tenant_id,
            member_id,
            balance: 0,
            suspended: false,
            updated_at: now,
        });
        account.balance += amount;
        account.updated_at = now;

        accounts::stage(&mut tx, &account)?;
        accounts::stage_entry(
            &mut tx,
            &LedgerEntry {
                id: Uuid::new_v4(),
                tenant_id,
                member_id,
                amount,
                balance_after: account.balance,
                reference_type: "deposit".to_string(),
                reference_id: String::new(),
                remark: "deposit".to_string(),
                created_at: now,
            },
        )?;
        tx.commit()?;

        tracing::debug!(tenant_id, member_id, amount, balance = account.balance, "Member account credited");
        Ok(account.balance)
    }

    pub async fn set_suspended(&self, tenant_id: TenantId, member_id: MemberId, suspended: bool) -> LotteryResult<()> {
        let mut tx = self.storage.begin().await;
        let mut account = accounts::load(&tx, tenant_id, member_id)?
            .ok_or(LotteryError::AccountNotFound { tenant_id, member_id })?;
        account.suspended = suspended;
        account.updated_at = self.clock.now();
        accounts::stage(&mut tx, &account)?;
        tx.commit()
    }

    pub fn balance(&self, tenant_id: TenantId, member_id: MemberId) -> LotteryResult<i64> {
        accounts::load(self.storage.as_ref(), tenant_id, member_id)?
            .map(|a| a.balance)
            .ok_or(LotteryError::AccountNotFound { tenant_id, member_id })
    }

    pub fn journal(&self, tenant_id: TenantId, member_id: MemberId) -> LotteryResult<Vec<LedgerEntry>> {
        accounts::journal(self.storage.as_ref(), tenant_id, member_id)
    }
}

#[async_trait]
impl Ledger for StoreLedger {
    async fn debit(&self, tx: &mut StoreTransaction<'_>, request: DebitRequest) -> LotteryResult<i64> {
        if request.amount <= 0 {
            return Err(LotteryError::InvalidAmount(request.amount));
        }

        let DebitRequest {
            tenant_id,
            member_id,
            amount,
            reference_type,
            reference_id,
            remark,
        } = request;

        let mut account = accounts::load(&*tx, tenant_id, member_id)?
            .ok_or(LotteryError::AccountNotFound { tenant_id, member_id })?;
        if account.suspended {
            return Err(LotteryError::MemberSuspended(member_id));
        }
        if account.balance < amount {
            return Err(LotteryError::InsufficientBalance {
                member_id,
                balance: account.balance,
                required: amount,
            });
        }

        let now = self.clock.now();
        account.balance -= amount;
        account.updated_at = now;
        accounts::stage(tx, &account)?;
        accounts::stage_entry(
            tx,
            &LedgerEntry {
                id: Uuid::new_v4(),
                tenant_id,
                member_id,
                amount: -amount,
                balance_after: account.balance,
                reference_type,
                reference_id,
                remark,
                created_at: now,
            },
        )?;

        Ok(account.balance)
    }
}
