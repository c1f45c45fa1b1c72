use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{load_json, scan_json, stage_json};
use crate::common::types::{MemberId, TenantId};
use crate::errors::LotteryResult;
use crate::storage::{KvRead, StoreTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAccount {
    pub tenant_id: TenantId,
    pub member_id: MemberId,
    pub balance: i64,
    pub suspended: bool,
    pub updated_at: DateTime<Utc>,
}

/// Journal line; `amount` is negative for debits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub member_id: MemberId,
    pub amount: i64,
    pub balance_after: i64,
    pub reference_type: String,
    pub reference_id: String,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

fn account_key(tenant_id: TenantId, member_id: MemberId) -> String {
    format!("account:{}:{}", tenant_id, member_id)
}

fn journal_prefix(tenant_id: TenantId, member_id: MemberId) -> String {
    format!("ledger:{}:{}:", tenant_id, member_id)
}

pub fn load<R: KvRead + ?Sized>(
    reader: &R,
    tenant_id: TenantId,
    member_id: MemberId,
) -> LotteryResult<Option<MemberAccount>> {
    load_json(reader, account_key(tenant_id, member_id).as_bytes())
}

pub fn stage(tx: &mut StoreTransaction<'_>, account: &MemberAccount) -> LotteryResult<()> {
    stage_json(tx, account_key(account.tenant_id, account.member_id), account)
}

pub fn stage_entry(tx: &mut StoreTransaction<'_>, entry: &LedgerEntry) -> LotteryResult<()> {
    // Millisecond timestamp first so the journal scans in time order
    let key = format!(
        "{}{:020}:{}",
        journal_prefix(entry.tenant_id, entry.member_id),
        entry.created_at.timestamp_millis().max(0),
        entry.id
    );
    stage_json(tx, key, entry)
}

pub fn journal<R: KvRead + ?Sized>(
    reader: &R,
    tenant_id: TenantId,
    member_id: MemberId,
) -> LotteryResult<Vec<LedgerEntry>> {
    scan_json(reader, journal_prefix(tenant_id, member_id).as_bytes())
}
