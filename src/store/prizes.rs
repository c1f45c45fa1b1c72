use uuid::Uuid;

use super::{load_json, scan_json, stage_json};
use crate::errors::{LotteryError, LotteryResult};
use crate::prize::{Prize, PrizeRule};
use crate::storage::{KvRead, StoreTransaction};

fn prize_key(id: Uuid) -> String {
    format!("prize:{}", id)
}

fn rule_key(id: Uuid) -> String {
    format!("prizerule:{}", id)
}

fn rule_index_prefix(game_code: &str, match_count: usize) -> String {
    format!("prizerule_idx:{}:{}:", game_code, match_count)
}

pub fn load<R: KvRead + ?Sized>(reader: &R, id: Uuid) -> LotteryResult<Option<Prize>> {
    load_json(reader, prize_key(id).as_bytes())
}

pub fn require<R: KvRead + ?Sized>(reader: &R, id: Uuid) -> LotteryResult<Prize> {
    load(reader, id)?.ok_or(LotteryError::PrizeNotFound(id))
}

pub fn stage(tx: &mut StoreTransaction<'_>, prize: &Prize) -> LotteryResult<()> {
    stage_json(tx, prize_key(prize.id), prize)
}

pub fn require_rule<R: KvRead + ?Sized>(reader: &R, id: Uuid) -> LotteryResult<PrizeRule> {
    load_json(reader, rule_key(id).as_bytes())?.ok_or(LotteryError::PrizeRuleNotFound(id))
}

pub fn stage_rule(tx: &mut StoreTransaction<'_>, rule: &PrizeRule) -> LotteryResult<()> {
    stage_json(tx, rule_key(rule.id), rule)?;
    let index_key = format!("{}{}", rule_index_prefix(&rule.game_code, rule.match_count), rule.id);
    stage_json(tx, index_key, &rule.id)
}

/// Every rule, active or not, for one (game, match count)
pub fn rules_for<R: KvRead + ?Sized>(
    reader: &R,
    game_code: &str,
    match_count: usize,
) -> LotteryResult<Vec<PrizeRule>> {
    let ids: Vec<Uuid> = scan_json(reader, rule_index_prefix(game_code, match_count).as_bytes())?;
    ids.into_iter().map(|id| require_rule(reader, id)).collect()
}
