//! Settlement engine: turns an executed draw's tickets into prize awards.
//!
//! A line wins when an effective prize rule exists for its game and match
//! count. The play rule's tier, when one matches, only labels the award.
//!
//! Each ticket is settled in its own store transaction. Awards are keyed by
//! (tenant, draw, ticket, line), so running settlement again after a partial
//! failure, or twice in a row, creates nothing new and leaves the existing
//! awards untouched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::common::types::match_count;
use crate::common::Clock;
use crate::draw::{Draw, DrawStatus};
use crate::errors::{LotteryError, LotteryResult};
use crate::games::RuleRegistry;
use crate::metrics::LotteryMetrics;
use crate::prize::{resolve_rule, AwardStatus, PrizeAward, PrizeSnapshot};
use crate::storage::OptimizedStorage;
use crate::store::{awards, draws, prizes, tickets};
use crate::ticket::{ParticipationStatus, SubmissionStatus};

/// Counters for one settlement pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub draw_id: Uuid,
    pub tickets_scanned: usize,
    /// Unsubmitted, cancelled, or invalid participations
    pub tickets_skipped: usize,
    pub lines_evaluated: usize,
    pub awards_created: usize,
    pub awards_existing: usize,
    pub lines_without_prize: usize,
}

pub struct SettlementEngine {
    storage: Arc<OptimizedStorage>,
    registry: Arc<RuleRegistry>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LotteryMetrics>,
}

impl SettlementEngine {
    pub fn new(
        storage: Arc<OptimizedStorage>,
        registry: Arc<RuleRegistry>,
        clock: Arc<dyn Clock>,
        metrics: Arc<LotteryMetrics>,
    ) -> Self {
        Self {
            storage,
            registry,
            clock,
            metrics,
        }
    }

    pub async fn settle_draw(&self, draw_id: Uuid) -> LotteryResult<SettlementReport> {
        let draw = draws::require(self.storage.as_ref(), draw_id)?;
        match draw.status {
            DrawStatus::Cancelled => return Err(LotteryError::DrawCancelled(draw_id)),
            DrawStatus::Settled if draw.is_executed() => {}
            _ => return Err(LotteryError::DrawNotExecuted(draw_id)),
        }

        let mut report = SettlementReport {
            draw_id,
            ..SettlementReport::default()
        };
        for ticket_id in tickets::ticket_ids_for_draw(self.storage.as_ref(), draw_id)? {
            report.tickets_scanned += 1;
            self.settle_ticket(&draw, ticket_id, &mut report).await?;
        }

        self.metrics.settlement_runs.inc();
        info!(
            draw_id = %draw_id,
            tickets = report.tickets_scanned,
            awards_created = report.awards_created,
            awards_existing = report.awards_existing,
            "Draw settlement finished"
        );
        Ok(report)
    }

    async fn settle_ticket(&self, draw: &Draw, ticket_id: Uuid, report: &mut SettlementReport) -> LotteryResult<()> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;

        let ticket = tickets::require(&tx, ticket_id)?;
        let Some(mut participation) = tickets::load_participation(&tx, ticket_id, draw.id)? else {
            report.tickets_skipped += 1;
            return Ok(());
        };
        let eligible = matches!(
            participation.status,
            ParticipationStatus::Active | ParticipationStatus::Settled | ParticipationStatus::Redeemed
        );
        let Some(play_type) = ticket.play_type.as_deref() else {
            report.tickets_skipped += 1;
            return Ok(());
        };
        if !eligible || ticket.status != SubmissionStatus::Submitted {
            report.tickets_skipped += 1;
            return Ok(());
        }

        let rule = self.registry.rule(&ticket.game_code, play_type)?;
        let winning = draw
            .winning_numbers
            .as_deref()
            .ok_or(LotteryError::DrawNotExecuted(draw.id))?;

        let mut created = 0u64;
        for line in &ticket.lines {
            report.lines_evaluated += 1;
            let matched = match_count(&line.numbers, winning);
            // The prize rule decides; the play tier only labels the award
            let tier_code = rule.evaluate(&line.numbers, winning).map(|tier| tier.code.clone());
            let Some(prize_rule) = resolve_rule(&tx, &ticket.game_code, matched, now)? else {
                report.lines_without_prize += 1;
                continue;
            };
            if awards::find_for_line(&tx, ticket.tenant_id, draw.id, ticket.id, line.index)?.is_some() {
                report.awards_existing += 1;
                continue;
            }

            let prize = prizes::require(&tx, prize_rule.prize_id)?;
            let snapshot = PrizeSnapshot::from(&prize);
            let award = PrizeAward {
                id: Uuid::new_v4(),
                tenant_id: ticket.tenant_id,
                member_id: ticket.member_id,
                draw_id: draw.id,
                ticket_id: ticket.id,
                line_index: line.index,
                matched,
                tier_code,
                prize_rule_id: prize_rule.id,
                prize_id: prize.id,
                expires_at: PrizeAward::expiry_for(now, &snapshot),
                snapshot,
                status: AwardStatus::Awarded,
                awarded_at: now,
                redeemed_at: None,
            };
            awards::stage_new(&mut tx, &award)?;
            report.awards_created += 1;
            created += 1;
            debug!(
                award_id = %award.id,
                ticket_id = %ticket.id,
                line = line.index,
                matched,
                tier = award.tier_code.as_deref().unwrap_or("-"),
                "Prize award created"
            );
        }

        if participation.status == ParticipationStatus::Active {
            participation.mark_settled(draw, now)?;
            tickets::stage_participation(&mut tx, &participation)?;
        }
        tx.commit()?;

        self.metrics.awards_created.inc_by(created);
        Ok(())
    }
}
