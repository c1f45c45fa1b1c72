//! Draw lifecycle: creation, lazy status refresh, seed commitment, execution,
//! manual close/reopen, cancellation and public verification.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::common::{Clock, SeedStore, TenantId};
use crate::config::LotteryConfig;
use crate::draw::model::{effective_status, Draw, DrawStatus};
use crate::errors::{LotteryError, LotteryResult};
use crate::fairness::{self, DERIVATION_ALGORITHM};
use crate::games::RuleRegistry;
use crate::metrics::LotteryMetrics;
use crate::storage::{OptimizedStorage, StoreTransaction};
use crate::store::draws::{self, AllowedTemplate};
use crate::store::tickets;
use crate::ticket::ParticipationStatus;

const MAX_SEED_TTL_MARGIN_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDrawRequest {
    pub tenant_id: TenantId,
    pub game_code: String,
    pub sales_open_at: DateTime<Utc>,
    pub sales_close_at: DateTime<Utc>,
    pub draw_at: DateTime<Utc>,
    /// Empty enables every registered play type of the game
    #[serde(default)]
    pub enabled_play_types: Vec<String>,
}

/// Result of recomputing a draw's proof from its public fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawVerification {
    pub draw_id: Uuid,
    pub server_seed_hash: String,
    pub server_seed: String,
    pub algorithm: String,
    pub input: String,
    pub winning_numbers: Vec<u8>,
}

pub struct DrawService {
    storage: Arc<OptimizedStorage>,
    registry: Arc<RuleRegistry>,
    seed_store: Arc<dyn SeedStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LotteryMetrics>,
    config: Arc<LotteryConfig>,
}

impl DrawService {
    pub fn new(
        storage: Arc<OptimizedStorage>,
        registry: Arc<RuleRegistry>,
        seed_store: Arc<dyn SeedStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<LotteryMetrics>,
        config: Arc<LotteryConfig>,
    ) -> Self {
        Self {
            storage,
            registry,
            seed_store,
            clock,
            metrics,
            config,
        }
    }

    pub async fn create_draw(&self, request: CreateDrawRequest) -> LotteryResult<Draw> {
        self.registry.game(&request.game_code)?;
        for play_type in &request.enabled_play_types {
            self.registry.rule_for_bet(&request.game_code, play_type)?;
        }
        if request.sales_open_at >= request.sales_close_at || request.sales_close_at > request.draw_at {
            return Err(LotteryError::InvalidSalesWindow(format!(
                "expected sales_open_at < sales_close_at <= draw_at, got {} / {} / {}",
                request.sales_open_at, request.sales_close_at, request.draw_at
            )));
        }

        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let draw = self.insert_draw(&mut tx, request, now).await?;
        tx.commit()?;
        Ok(draw)
    }

    async fn insert_draw(
        &self,
        tx: &mut StoreTransaction<'_>,
        request: CreateDrawRequest,
        now: DateTime<Utc>,
    ) -> LotteryResult<Draw> {
        let mut draw = Draw::new(
            request.tenant_id,
            &request.game_code,
            request.sales_open_at,
            request.sales_close_at,
            request.draw_at,
            request.enabled_play_types,
            now,
        );
        self.sync_status(&mut draw, now).await?;
        draws::stage(tx, &draw)?;

        self.metrics.draws_created.inc();
        info!(
            draw_id = %draw.id,
            tenant_id = draw.tenant_id,
            game_code = %draw.game_code,
            draw_at = %draw.draw_at,
            "Draw created"
        );
        Ok(draw)
    }

    /// Load a draw with its status brought up to date; the change is persisted
    pub async fn get_draw(&self, draw_id: Uuid) -> LotteryResult<Draw> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let draw = self.load_synced(&mut tx, draw_id, now).await?;
        tx.commit()?;
        Ok(draw)
    }

    pub fn list_draws(&self, tenant_id: TenantId, game_code: &str) -> LotteryResult<Vec<Draw>> {
        draws::list_for_game(self.storage.as_ref(), tenant_id, game_code)
    }

    pub(crate) async fn load_synced(
        &self,
        tx: &mut StoreTransaction<'_>,
        draw_id: Uuid,
        now: DateTime<Utc>,
    ) -> LotteryResult<Draw> {
        let mut draw = draws::require(&*tx, draw_id)?;
        if self.sync_status(&mut draw, now).await? {
            draws::stage(tx, &draw)?;
        }
        Ok(draw)
    }

    /// Apply [`effective_status`] and commit a seed on entering SalesOpen.
    /// Returns whether the draw changed; staging is left to the caller.
    async fn sync_status(&self, draw: &mut Draw, now: DateTime<Utc>) -> LotteryResult<bool> {
        let mut changed = false;

        let status = effective_status(now, draw);
        if status != draw.status {
            debug!(draw_id = %draw.id, from = %draw.status, to = %status, "Draw status refreshed");
            draw.status = status;
            changed = true;
        }

        if draw.status == DrawStatus::SalesOpen && draw.server_seed_hash.is_none() {
            self.commit_seed(draw, now).await?;
            changed = true;
        }

        Ok(changed)
    }

    /// Generate a seed, hand it to the seed store and publish its hash on the draw
    async fn commit_seed(&self, draw: &mut Draw, now: DateTime<Utc>) -> LotteryResult<()> {
        let seed = fairness::create_server_seed();
        let hash = fairness::compute_server_seed_hash(&seed);

        let until_draw = (draw.draw_at - now).max(Duration::zero());
        let margin_secs = self.config.fairness.seed_ttl_margin_secs.min(MAX_SEED_TTL_MARGIN_SECS);
        let margin = Duration::seconds(margin_secs as i64);
        self.seed_store.store(draw.id, &seed, until_draw + margin).await?;

        info!(draw_id = %draw.id, server_seed_hash = %hash, "Server seed committed");
        draw.server_seed_hash = Some(hash);
        Ok(())
    }

    /// Force a scheduled draw to start selling now
    pub async fn open_sales(&self, draw_id: Uuid) -> LotteryResult<Draw> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let mut draw = self.load_synced(&mut tx, draw_id, now).await?;

        match draw.status {
            DrawStatus::SalesOpen => {}
            DrawStatus::Scheduled => {
                draw.sales_open_at = now;
                self.sync_status(&mut draw, now).await?;
                draws::stage(&mut tx, &draw)?;
                info!(draw_id = %draw.id, "Draw sales opened early");
            }
            DrawStatus::Settled => return Err(LotteryError::DrawAlreadySettled(draw_id)),
            DrawStatus::Cancelled => return Err(LotteryError::DrawCancelled(draw_id)),
            DrawStatus::SalesClosed => {
                return Err(LotteryError::DrawNotOpen {
                    draw_id,
                    status: draw.status.to_string(),
                })
            }
        }

        tx.commit()?;
        Ok(draw)
    }

    /// Draw of the current scheduled cycle for a game, created on first access
    pub async fn current_draw(&self, tenant_id: TenantId, game_code: &str) -> LotteryResult<Draw> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let draw = self.current_draw_in(&mut tx, tenant_id, game_code, now).await?;
        tx.commit()?;
        Ok(draw)
    }

    pub(crate) async fn current_draw_in(
        &self,
        tx: &mut StoreTransaction<'_>,
        tenant_id: TenantId,
        game_code: &str,
        now: DateTime<Utc>,
    ) -> LotteryResult<Draw> {
        self.registry.game(game_code)?;

        let existing = draws::list_for_game(&*tx, tenant_id, game_code)?;
        if let Some(open) = existing
            .iter()
            .find(|d| !d.status.is_terminal() && !d.manually_closed && d.in_sales_window(now))
        {
            return self.load_synced(tx, open.id, now).await;
        }

        let schedule = self.config.schedule_for(game_code).ok_or_else(|| {
            LotteryError::InvalidSalesWindow(format!("no draw schedule configured for game {}", game_code))
        })?;
        let (open_at, close_at, draw_at) = cycle_window(
            now,
            schedule.period_secs as i64,
            schedule.sales_close_lead_secs as i64,
        )?;

        if let Some(same_cycle) = existing
            .iter()
            .find(|d| d.sales_open_at == open_at && d.draw_at == draw_at)
        {
            return self.load_synced(tx, same_cycle.id, now).await;
        }

        let request = CreateDrawRequest {
            tenant_id,
            game_code: game_code.to_string(),
            sales_open_at: open_at,
            sales_close_at: close_at,
            draw_at,
            enabled_play_types: Vec::new(),
        };
        self.insert_draw(tx, request, now).await
    }

    /// Reveal the seed, derive the winning numbers and settle the draw
    pub async fn execute_draw(&self, draw_id: Uuid) -> LotteryResult<Draw> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let mut draw = self.load_synced(&mut tx, draw_id, now).await?;

        match draw.status {
            DrawStatus::Settled => return Err(LotteryError::DrawAlreadySettled(draw_id)),
            DrawStatus::Cancelled => return Err(LotteryError::DrawCancelled(draw_id)),
            _ => {}
        }
        if draw.is_executed() {
            return Err(LotteryError::DrawAlreadySettled(draw_id));
        }
        if now < draw.draw_at {
            return Err(LotteryError::DrawNotDue {
                draw_id,
                draw_at: draw.draw_at,
            });
        }

        if draw.server_seed_hash.is_none() {
            warn!(draw_id = %draw.id, "No seed commitment at draw time, committing now");
            self.commit_seed(&mut draw, now).await?;
        }
        let committed_hash = draw
            .server_seed_hash
            .clone()
            .ok_or(LotteryError::ServerSeedMissing(draw_id))?;

        let seed = self
            .seed_store
            .get(draw_id)
            .await?
            .ok_or(LotteryError::ServerSeedMissing(draw_id))?;
        if fairness::compute_server_seed_hash(&seed) != committed_hash {
            return Err(LotteryError::SeedHashMismatch(draw_id));
        }

        let game = self.registry.game(&draw.game_code)?;
        let result = fairness::generate_winning_numbers(draw.id, &seed, game)?;

        draw.server_seed = Some(seed);
        draw.derivation_algorithm = Some(result.algorithm);
        draw.derivation_input = Some(result.input);
        draw.winning_numbers = Some(result.numbers);
        draw.status = DrawStatus::Settled;
        draw.executed_at = Some(now);
        draws::stage(&mut tx, &draw)?;
        tx.commit()?;

        self.metrics.draws_executed.inc();
        info!(
            draw_id = %draw.id,
            winning_numbers = ?draw.winning_numbers,
            "Draw executed"
        );
        Ok(draw)
    }

    pub async fn manual_close(&self, draw_id: Uuid, reason: &str) -> LotteryResult<Draw> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let mut draw = self.load_synced(&mut tx, draw_id, now).await?;
        ensure_not_terminal(&draw)?;

        draw.manually_closed = true;
        draw.manual_close_reason = Some(reason.to_string());
        draw.manually_closed_at = Some(now);
        draw.status = DrawStatus::SalesClosed;
        draws::stage(&mut tx, &draw)?;
        tx.commit()?;

        info!(draw_id = %draw.id, reason, "Draw sales closed manually");
        Ok(draw)
    }

    /// Put a closed draw back on sale.
    ///
    /// Allowed while `sales_open_at <= now < draw_at` and no numbers were
    /// drawn. When the scheduled close has already passed, sales run until
    /// the draw time.
    pub async fn reopen(&self, draw_id: Uuid) -> LotteryResult<Draw> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let mut draw = self.load_synced(&mut tx, draw_id, now).await?;

        match draw.status {
            DrawStatus::Cancelled => return Err(LotteryError::DrawCancelled(draw_id)),
            DrawStatus::Settled => return Err(LotteryError::DrawReopenWindowInvalid(draw_id)),
            DrawStatus::SalesClosed => {}
            other => {
                return Err(LotteryError::DrawNotClosed {
                    draw_id,
                    status: other.to_string(),
                })
            }
        }
        if draw.is_executed() || now < draw.sales_open_at || now >= draw.draw_at {
            return Err(LotteryError::DrawReopenWindowInvalid(draw_id));
        }

        draw.manually_closed = false;
        draw.manual_close_reason = None;
        draw.manually_closed_at = None;
        if now >= draw.sales_close_at {
            draw.sales_close_at = draw.draw_at;
        }
        draw.reopened_at = Some(now);
        self.sync_status(&mut draw, now).await?;
        draws::stage(&mut tx, &draw)?;
        tx.commit()?;

        info!(draw_id = %draw.id, sales_close_at = %draw.sales_close_at, "Draw reopened");
        Ok(draw)
    }

    /// Cancel a draw and every participation that has not been finalized
    pub async fn cancel_draw(&self, draw_id: Uuid, reason: &str) -> LotteryResult<Draw> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let mut draw = self.load_synced(&mut tx, draw_id, now).await?;
        match draw.status {
            DrawStatus::Settled => return Err(LotteryError::DrawAlreadySettled(draw_id)),
            DrawStatus::Cancelled => return Err(LotteryError::DrawCancelled(draw_id)),
            _ => {}
        }

        draw.status = DrawStatus::Cancelled;
        draw.cancelled_at = Some(now);
        draw.cancel_reason = Some(reason.to_string());
        draws::stage(&mut tx, &draw)?;

        let mut cancelled = 0usize;
        for ticket_id in tickets::ticket_ids_for_draw(&tx, draw_id)? {
            let Some(mut participation) = tickets::load_participation(&tx, ticket_id, draw_id)? else {
                continue;
            };
            if participation.is_finalized() || participation.status == ParticipationStatus::Cancelled {
                continue;
            }
            participation.status = ParticipationStatus::Cancelled;
            participation.updated_at = now;
            tickets::stage_participation(&mut tx, &participation)?;
            cancelled += 1;
        }
        tx.commit()?;

        self.metrics.draws_cancelled.inc();
        info!(draw_id = %draw.id, reason, participations = cancelled, "Draw cancelled");
        Ok(draw)
    }

    pub async fn allow_ticket_template(&self, draw_id: Uuid, template_id: Uuid) -> LotteryResult<AllowedTemplate> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let draw = self.load_synced(&mut tx, draw_id, now).await?;
        ensure_not_terminal(&draw)?;

        let allowed = AllowedTemplate {
            draw_id,
            template_id,
            allowed_at: now,
        };
        draws::stage_template(&mut tx, &allowed)?;
        tx.commit()?;

        debug!(draw_id = %draw_id, template_id = %template_id, "Ticket template allowed");
        Ok(allowed)
    }

    pub async fn revoke_ticket_template(&self, draw_id: Uuid, template_id: Uuid) -> LotteryResult<()> {
        let mut tx = self.storage.begin().await;
        draws::require(&tx, draw_id)?;
        draws::remove_template(&mut tx, draw_id, template_id);
        tx.commit()?;

        debug!(draw_id = %draw_id, template_id = %template_id, "Ticket template revoked");
        Ok(())
    }

    pub fn allowed_templates(&self, draw_id: Uuid) -> LotteryResult<Vec<AllowedTemplate>> {
        draws::allowed_templates(self.storage.as_ref(), draw_id)
    }

    /// Recompute hash and numbers of an executed draw from its stored fields
    pub fn verify_draw(&self, draw_id: Uuid) -> LotteryResult<DrawVerification> {
        let draw = draws::require(self.storage.as_ref(), draw_id)?;
        let winning = draw
            .winning_numbers
            .clone()
            .ok_or(LotteryError::DrawNotExecuted(draw_id))?;
        let seed = draw
            .server_seed
            .clone()
            .ok_or(LotteryError::ServerSeedMissing(draw_id))?;
        let hash = draw
            .server_seed_hash
            .clone()
            .ok_or(LotteryError::SeedHashMismatch(draw_id))?;
        if draw.derivation_algorithm.as_deref() != Some(DERIVATION_ALGORITHM) {
            return Err(LotteryError::DerivationFailed(format!(
                "draw {} uses unsupported algorithm {:?}",
                draw_id, draw.derivation_algorithm
            )));
        }

        let game = self.registry.game(&draw.game_code)?;
        let derived = fairness::verify_reveal(draw_id, &seed, &hash, &winning, game)?;
        if draw.derivation_input.as_deref() != Some(derived.input.as_str()) {
            return Err(LotteryError::SeedHashMismatch(draw_id));
        }

        Ok(DrawVerification {
            draw_id,
            server_seed_hash: hash,
            server_seed: seed,
            algorithm: derived.algorithm,
            input: derived.input,
            winning_numbers: derived.numbers,
        })
    }
}

fn ensure_not_terminal(draw: &Draw) -> LotteryResult<()> {
    match draw.status {
        DrawStatus::Settled => Err(LotteryError::DrawAlreadySettled(draw.id)),
        DrawStatus::Cancelled => Err(LotteryError::DrawCancelled(draw.id)),
        _ => Ok(()),
    }
}

/// Sales window of the epoch-aligned cycle containing `now`
pub(crate) fn cycle_window(
    now: DateTime<Utc>,
    period_secs: i64,
    close_lead_secs: i64,
) -> LotteryResult<(DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> {
    if period_secs <= 0 || close_lead_secs < 0 || close_lead_secs >= period_secs {
        return Err(LotteryError::InvalidSalesWindow(format!(
            "period {}s with close lead {}s",
            period_secs, close_lead_secs
        )));
    }

    let start_secs = now.timestamp().div_euclid(period_secs) * period_secs;
    let open_at = Utc
        .timestamp_opt(start_secs, 0)
        .single()
        .ok_or_else(|| LotteryError::InvalidSalesWindow(format!("timestamp {} out of range", start_secs)))?;
    let draw_at = open_at + Duration::seconds(period_secs);
    let close_at = draw_at - Duration::seconds(close_lead_secs);
    Ok((open_at, close_at, draw_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_window_alignment() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 17, 42).unwrap();
        let (open, close, draw) = cycle_window(now, 3600, 300).unwrap();

        assert_eq!(open, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        assert_eq!(draw, Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap());
        assert_eq!(close, Utc.with_ymd_and_hms(2024, 5, 1, 10, 55, 0).unwrap());
    }

    #[test]
    fn test_cycle_window_rejects_bad_schedule() {
        let now = Utc::now();
        assert!(cycle_window(now, 0, 0).is_err());
        assert!(cycle_window(now, 60, 60).is_err());
    }
}
