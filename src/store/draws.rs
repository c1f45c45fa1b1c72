use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{load_json, scan_json, stage_json};
use crate::common::types::TenantId;
use crate::draw::Draw;
use crate::errors::{LotteryError, LotteryResult};
use crate::storage::{KvRead, StoreTransaction};

/// Ticket template explicitly allowed on a draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedTemplate {
    pub draw_id: Uuid,
    pub template_id: Uuid,
    pub allowed_at: DateTime<Utc>,
}

fn draw_key(id: Uuid) -> String {
    format!("draw:{}", id)
}

fn game_index_prefix(tenant_id: TenantId, game_code: &str) -> String {
    format!("drawidx:game:{}:{}:", tenant_id, game_code)
}

fn template_key(draw_id: Uuid, template_id: Uuid) -> String {
    format!("drawtpl:{}:{}", draw_id, template_id)
}

pub fn load<R: KvRead + ?Sized>(reader: &R, id: Uuid) -> LotteryResult<Option<Draw>> {
    load_json(reader, draw_key(id).as_bytes())
}

pub fn require<R: KvRead + ?Sized>(reader: &R, id: Uuid) -> LotteryResult<Draw> {
    load(reader, id)?.ok_or(LotteryError::DrawNotFound(id))
}

/// Insert or update; the game index entry is rewritten idempotently
pub fn stage(tx: &mut StoreTransaction<'_>, draw: &Draw) -> LotteryResult<()> {
    stage_json(tx, draw_key(draw.id), draw)?;
    let index_key = format!("{}{}", game_index_prefix(draw.tenant_id, &draw.game_code), draw.id);
    stage_json(tx, index_key, &draw.id)
}

pub fn list_for_game<R: KvRead + ?Sized>(
    reader: &R,
    tenant_id: TenantId,
    game_code: &str,
) -> LotteryResult<Vec<Draw>> {
    let ids: Vec<Uuid> = scan_json(reader, game_index_prefix(tenant_id, game_code).as_bytes())?;
    let mut draws = Vec::with_capacity(ids.len());
    for id in ids {
        draws.push(require(reader, id)?);
    }
    draws.sort_by_key(|d| d.sales_open_at);
    Ok(draws)
}

pub fn template_allowed<R: KvRead + ?Sized>(
    reader: &R,
    draw_id: Uuid,
    template_id: Uuid,
) -> LotteryResult<bool> {
    Ok(reader.read(template_key(draw_id, template_id).as_bytes())?.is_some())
}

pub fn stage_template(tx: &mut StoreTransaction<'_>, allowed: &AllowedTemplate) -> LotteryResult<()> {
    stage_json(tx, template_key(allowed.draw_id, allowed.template_id), allowed)
}

pub fn remove_template(tx: &mut StoreTransaction<'_>, draw_id: Uuid, template_id: Uuid) {
    tx.delete(template_key(draw_id, template_id));
}

pub fn allowed_templates<R: KvRead + ?Sized>(reader: &R, draw_id: Uuid) -> LotteryResult<Vec<AllowedTemplate>> {
    scan_json(reader, format!("drawtpl:{}:", draw_id).as_bytes())
}
