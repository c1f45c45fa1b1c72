use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::common::Clock;
use crate::errors::{LotteryError, LotteryResult};
use crate::games::RuleRegistry;
use crate::prize::model::{Prize, PrizeRule};
use crate::storage::{KvRead, OptimizedStorage};
use crate::store::prizes;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrize {
    pub name: String,
    pub description: Option<String>,
    pub cost: i64,
    pub redeem_window_days: Option<u32>,
}

/// Rules are keyed by game and match count only. Every play type of the game
/// shares the prize, so a pick3 line and a straight line with the same number
/// of hits receive the same award.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrizeRule {
    pub game_code: String,
    pub match_count: usize,
    pub prize_id: Uuid,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
}

/// Prize rule in force for (game, match count) at `at`.
///
/// Writes reject overlapping windows, so at most one rule qualifies; the
/// earliest `effective_from` wins should legacy data contain more.
pub fn resolve_rule<R: KvRead + ?Sized>(
    reader: &R,
    game_code: &str,
    match_count: usize,
    at: DateTime<Utc>,
) -> LotteryResult<Option<PrizeRule>> {
    Ok(prizes::rules_for(reader, game_code, match_count)?
        .into_iter()
        .filter(|rule| rule.is_effective_at(at))
        .min_by_key(|rule| rule.effective_from))
}

/// Record operations on prizes and prize rules
pub struct PrizeCatalog {
    storage: Arc<OptimizedStorage>,
    registry: Arc<RuleRegistry>,
    clock: Arc<dyn Clock>,
}

impl PrizeCatalog {
    pub fn new(storage: Arc<OptimizedStorage>, registry: Arc<RuleRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            registry,
            clock,
        }
    }

    pub async fn create_prize(&self, request: NewPrize) -> LotteryResult<Prize> {
        if request.cost < 0 {
            return Err(LotteryError::InvalidAmount(request.cost));
        }
        if request.name.trim().is_empty() {
            return Err(LotteryError::InvalidRequest("prize name is empty".to_string()));
        }

        let now = self.clock.now();
        let prize = Prize {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            cost: request.cost,
            redeem_window_days: request.redeem_window_days,
            active: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.storage.begin().await;
        prizes::stage(&mut tx, &prize)?;
        tx.commit()?;

        info!(prize_id = %prize.id, name = %prize.name, cost = prize.cost, "Prize created");
        Ok(prize)
    }

    pub fn get_prize(&self, prize_id: Uuid) -> LotteryResult<Prize> {
        prizes::require(self.storage.as_ref(), prize_id)
    }

    /// Existing awards and redeem records keep the cost they captured
    pub async fn update_prize_cost(&self, prize_id: Uuid, cost: i64) -> LotteryResult<Prize> {
        if cost < 0 {
            return Err(LotteryError::InvalidAmount(cost));
        }

        let mut tx = self.storage.begin().await;
        let mut prize = prizes::require(&tx, prize_id)?;
        prize.cost = cost;
        prize.updated_at = self.clock.now();
        prizes::stage(&mut tx, &prize)?;
        tx.commit()?;

        info!(prize_id = %prize.id, cost, "Prize cost updated");
        Ok(prize)
    }

    pub async fn set_prize_active(&self, prize_id: Uuid, active: bool) -> LotteryResult<Prize> {
        let mut tx = self.storage.begin().await;
        let mut prize = prizes::require(&tx, prize_id)?;
        prize.active = active;
        prize.updated_at = self.clock.now();
        prizes::stage(&mut tx, &prize)?;
        tx.commit()?;

        info!(prize_id = %prize.id, active, "Prize activation changed");
        Ok(prize)
    }

    pub async fn create_rule(&self, request: NewPrizeRule) -> LotteryResult<PrizeRule> {
        let game = self.registry.game(&request.game_code)?;
        if request.match_count == 0 || request.match_count > game.pick_count {
            return Err(LotteryError::InvalidRequest(format!(
                "match count {} outside 1..={} for game {}",
                request.match_count, game.pick_count, game.code
            )));
        }
        if let Some(to) = request.effective_to {
            if to <= request.effective_from {
                return Err(LotteryError::InvalidRequest(
                    "effective_to must be after effective_from".to_string(),
                ));
            }
        }

        let rule = PrizeRule {
            id: Uuid::new_v4(),
            game_code: request.game_code,
            match_count: request.match_count,
            prize_id: request.prize_id,
            effective_from: request.effective_from,
            effective_to: request.effective_to,
            active: true,
        };

        let mut tx = self.storage.begin().await;
        prizes::require(&tx, rule.prize_id)?;
        if let Some(existing) = prizes::rules_for(&tx, &rule.game_code, rule.match_count)?
            .into_iter()
            .find(|existing| existing.overlaps(&rule))
        {
            return Err(LotteryError::PrizeRuleConflict {
                game_code: rule.game_code,
                match_count: rule.match_count,
                existing_rule_id: existing.id,
            });
        }
        prizes::stage_rule(&mut tx, &rule)?;
        tx.commit()?;

        info!(
            rule_id = %rule.id,
            game_code = %rule.game_code,
            match_count = rule.match_count,
            prize_id = %rule.prize_id,
            "Prize rule created"
        );
        Ok(rule)
    }

    pub async fn deactivate_rule(&self, rule_id: Uuid) -> LotteryResult<PrizeRule> {
        let mut tx = self.storage.begin().await;
        let mut rule = prizes::require_rule(&tx, rule_id)?;
        rule.active = false;
        prizes::stage_rule(&mut tx, &rule)?;
        tx.commit()?;

        info!(rule_id = %rule.id, "Prize rule deactivated");
        Ok(rule)
    }

    pub fn resolve(&self, game_code: &str, match_count: usize, at: DateTime<Utc>) -> LotteryResult<Option<PrizeRule>> {
        resolve_rule(self.storage.as_ref(), game_code, match_count, at)
    }
}
