use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::common::Clock;
use crate::errors::{LotteryError, LotteryResult};
use crate::metrics::LotteryMetrics;
use crate::prize::model::{AwardStatus, PrizeAward, RedeemRecord};
use crate::storage::OptimizedStorage;
use crate::store::{awards, draws, prizes, tickets};

pub struct RedemptionService {
    storage: Arc<OptimizedStorage>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LotteryMetrics>,
}

impl RedemptionService {
    pub fn new(storage: Arc<OptimizedStorage>, clock: Arc<dyn Clock>, metrics: Arc<LotteryMetrics>) -> Self {
        Self {
            storage,
            clock,
            metrics,
        }
    }

    pub fn get_award(&self, award_id: Uuid) -> LotteryResult<PrizeAward> {
        awards::require(self.storage.as_ref(), award_id)
    }

    pub fn awards_for_draw(&self, draw_id: Uuid) -> LotteryResult<Vec<PrizeAward>> {
        awards::list_for_draw(self.storage.as_ref(), draw_id)
    }

    /// Redeem an award. Repeating the call returns the original record.
    pub async fn redeem(&self, award_id: Uuid, redeemed_by: Option<String>) -> LotteryResult<RedeemRecord> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;

        let mut award = awards::require(&tx, award_id)?;
        if let Some(existing) = awards::load_redeem_record(&tx, award_id)? {
            return Ok(existing);
        }
        if award.status != AwardStatus::Awarded {
            return Err(LotteryError::AwardNotRedeemable {
                award_id,
                status: award.status.to_string(),
            });
        }
        if award.is_expired_at(now) {
            award.status = AwardStatus::Expired;
            awards::stage(&mut tx, &award)?;
            tx.commit()?;
            warn!(award_id = %award_id, "Redemption attempted on expired award");
            return Err(LotteryError::AwardExpired(award_id));
        }

        let prize = prizes::require(&tx, award.prize_id)?;
        if !prize.active {
            return Err(LotteryError::PrizeInactive(prize.id));
        }

        let record = RedeemRecord {
            id: Uuid::new_v4(),
            award_id,
            tenant_id: award.tenant_id,
            member_id: award.member_id,
            prize_id: prize.id,
            cost_snapshot: prize.cost,
            redeemed_by,
            redeemed_at: now,
        };
        award.status = AwardStatus::Redeemed;
        award.redeemed_at = Some(now);

        awards::stage_redeem_record(&mut tx, &record)?;
        awards::stage(&mut tx, &award)?;

        if let Some(mut participation) = tickets::load_participation(&tx, award.ticket_id, award.draw_id)? {
            let draw = draws::require(&tx, award.draw_id)?;
            participation.mark_redeemed(&draw, now)?;
            tickets::stage_participation(&mut tx, &participation)?;
        }
        tx.commit()?;

        self.metrics.redemptions.inc();
        info!(
            award_id = %award_id,
            redeem_id = %record.id,
            cost = record.cost_snapshot,
            "Prize award redeemed"
        );
        Ok(record)
    }
}
