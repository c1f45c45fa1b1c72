use uuid::Uuid;

use super::{load_json, scan_json, stage_json};
use crate::common::types::TenantId;
use crate::errors::{LotteryError, LotteryResult};
use crate::prize::{PrizeAward, RedeemRecord};
use crate::storage::{KvRead, StoreTransaction};

fn award_key(id: Uuid) -> String {
    format!("award:{}", id)
}

/// Uniqueness key: one award per (tenant, draw, ticket, line)
fn idempotence_key(tenant_id: TenantId, draw_id: Uuid, ticket_id: Uuid, line_index: u32) -> String {
    format!("awardkey:{}:{}:{}:{}", tenant_id, draw_id, ticket_id, line_index)
}

fn draw_index_key(draw_id: Uuid, award_id: Uuid) -> String {
    format!("award_by_draw:{}:{}", draw_id, award_id)
}

fn redeem_key(award_id: Uuid) -> String {
    format!("redeem:{}", award_id)
}

pub fn load<R: KvRead + ?Sized>(reader: &R, id: Uuid) -> LotteryResult<Option<PrizeAward>> {
    load_json(reader, award_key(id).as_bytes())
}

pub fn require<R: KvRead + ?Sized>(reader: &R, id: Uuid) -> LotteryResult<PrizeAward> {
    load(reader, id)?.ok_or(LotteryError::AwardNotFound(id))
}

/// Id of the award already created for this line, if any
pub fn find_for_line<R: KvRead + ?Sized>(
    reader: &R,
    tenant_id: TenantId,
    draw_id: Uuid,
    ticket_id: Uuid,
    line_index: u32,
) -> LotteryResult<Option<Uuid>> {
    load_json(
        reader,
        idempotence_key(tenant_id, draw_id, ticket_id, line_index).as_bytes(),
    )
}

/// First write of an award: record, uniqueness key and draw index
pub fn stage_new(tx: &mut StoreTransaction<'_>, award: &PrizeAward) -> LotteryResult<()> {
    stage(tx, award)?;
    stage_json(
        tx,
        idempotence_key(award.tenant_id, award.draw_id, award.ticket_id, award.line_index),
        &award.id,
    )?;
    stage_json(tx, draw_index_key(award.draw_id, award.id), &award.id)
}

pub fn stage(tx: &mut StoreTransaction<'_>, award: &PrizeAward) -> LotteryResult<()> {
    stage_json(tx, award_key(award.id), award)
}

pub fn list_for_draw<R: KvRead + ?Sized>(reader: &R, draw_id: Uuid) -> LotteryResult<Vec<PrizeAward>> {
    let ids: Vec<Uuid> = scan_json(reader, format!("award_by_draw:{}:", draw_id).as_bytes())?;
    ids.into_iter().map(|id| require(reader, id)).collect()
}

pub fn load_redeem_record<R: KvRead + ?Sized>(reader: &R, award_id: Uuid) -> LotteryResult<Option<RedeemRecord>> {
    load_json(reader, redeem_key(award_id).as_bytes())
}

pub fn stage_redeem_record(tx: &mut StoreTransaction<'_>, record: &RedeemRecord) -> LotteryResult<()> {
    stage_json(tx, redeem_key(record.award_id), record)
}
