//! Ticket issuance, number submission and cancellation.
//!
//! Submission runs inside one store transaction. The writer lock serializes
//! competing submissions of the same ticket, so the "not yet submitted" check
//! and the flip to Submitted behave as a compare-and-swap: the second caller
//! reads the committed Submitted state and gets `TicketAlreadySubmittedConflict`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::common::{Clock, DebitRequest, Entitlements, Ledger, MemberId, TenantId};
use crate::draw::{effective_status, Draw, DrawService, DrawStatus};
use crate::errors::{LotteryError, LotteryResult};
use crate::games::RuleRegistry;
use crate::metrics::LotteryMetrics;
use crate::storage::{OptimizedStorage, StoreTransaction};
use crate::store::{draws, tickets};
use crate::ticket::model::{ParticipationStatus, SubmissionStatus, Ticket, TicketDraw, TicketLine};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTicketRequest {
    pub tenant_id: TenantId,
    pub member_id: MemberId,
    pub game_code: String,
    /// First entry becomes the primary draw
    pub draw_ids: Vec<Uuid>,
    pub campaign_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    /// Debited from the member at issuance; zero for free tickets
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitNumbersRequest {
    pub ticket_id: Uuid,
    pub play_type: String,
    pub lines: Vec<Vec<u8>>,
    pub submitted_by: Option<String>,
    pub client_reference: Option<String>,
    pub note: Option<String>,
}

/// Issue, pay and submit in a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    pub tenant_id: TenantId,
    pub member_id: MemberId,
    pub game_code: String,
    /// `None` places the bet on the game's current draw
    pub draw_id: Option<Uuid>,
    pub play_type: String,
    pub lines: Vec<Vec<u8>>,
    pub cost: i64,
    pub client_reference: Option<String>,
    pub note: Option<String>,
}

pub struct TicketService {
    storage: Arc<OptimizedStorage>,
    registry: Arc<RuleRegistry>,
    draws: Arc<DrawService>,
    ledger: Arc<dyn Ledger>,
    entitlements: Arc<dyn Entitlements>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LotteryMetrics>,
}

impl TicketService {
    pub fn new(
        storage: Arc<OptimizedStorage>,
        registry: Arc<RuleRegistry>,
        draws: Arc<DrawService>,
        ledger: Arc<dyn Ledger>,
        entitlements: Arc<dyn Entitlements>,
        clock: Arc<dyn Clock>,
        metrics: Arc<LotteryMetrics>,
    ) -> Self {
        Self {
            storage,
            registry,
            draws,
            ledger,
            entitlements,
            clock,
            metrics,
        }
    }

    pub fn get_ticket(&self, ticket_id: Uuid) -> LotteryResult<Ticket> {
        tickets::require(self.storage.as_ref(), ticket_id)
    }

    pub fn participations(&self, ticket_id: Uuid) -> LotteryResult<Vec<TicketDraw>> {
        tickets::require(self.storage.as_ref(), ticket_id)?;
        tickets::participations_for_ticket(self.storage.as_ref(), ticket_id)
    }

    pub fn tickets_for_draw(&self, draw_id: Uuid) -> LotteryResult<Vec<Ticket>> {
        tickets::ticket_ids_for_draw(self.storage.as_ref(), draw_id)?
            .into_iter()
            .map(|id| tickets::require(self.storage.as_ref(), id))
            .collect()
    }

    /// Create an unsubmitted ticket bound to one or more draws and charge its cost
    pub async fn issue_ticket(&self, request: IssueTicketRequest) -> LotteryResult<Ticket> {
        self.registry.game(&request.game_code)?;
        self.entitlements
            .ensure_game_enabled(request.tenant_id, &request.game_code)
            .await?;

        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let ticket = self.issue_in(&mut tx, request, now).await?;
        tx.commit()?;

        self.metrics.tickets_issued.inc();
        Ok(ticket)
    }

    pub async fn submit_numbers(&self, request: SubmitNumbersRequest) -> LotteryResult<Ticket> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;

        let ticket = match self.submit_in(&mut tx, request, now).await {
            Ok(ticket) => ticket,
            Err(err) => {
                if matches!(err, LotteryError::TicketAlreadySubmittedConflict(_)) {
                    self.metrics.submission_conflicts.inc();
                }
                return Err(err);
            }
        };
        tx.commit()?;

        self.metrics.tickets_submitted.inc();
        Ok(ticket)
    }

    /// Issue, debit and submit atomically
    pub async fn place_bet(&self, request: PlaceBetRequest) -> LotteryResult<Ticket> {
        self.registry.rule_for_bet(&request.game_code, &request.play_type)?;
        self.entitlements
            .ensure_game_enabled(request.tenant_id, &request.game_code)
            .await?;

        let now = self.clock.now();
        let mut tx = self.storage.begin().await;

        let draw_id = match request.draw_id {
            Some(draw_id) => draw_id,
            None => {
                self.draws
                    .current_draw_in(&mut tx, request.tenant_id, &request.game_code, now)
                    .await?
                    .id
            }
        };

        let issued = self
            .issue_in(
                &mut tx,
                IssueTicketRequest {
                    tenant_id: request.tenant_id,
                    member_id: request.member_id,
                    game_code: request.game_code,
                    draw_ids: vec![draw_id],
                    campaign_id: None,
                    template_id: None,
                    cost: request.cost,
                },
                now,
            )
            .await?;

        let ticket = self
            .submit_in(
                &mut tx,
                SubmitNumbersRequest {
                    ticket_id: issued.id,
                    play_type: request.play_type,
                    lines: request.lines,
                    submitted_by: Some(format!("member:{}", request.member_id)),
                    client_reference: request.client_reference,
                    note: request.note,
                },
                now,
            )
            .await?;
        tx.commit()?;

        self.metrics.tickets_issued.inc();
        self.metrics.tickets_submitted.inc();
        Ok(ticket)
    }

    async fn issue_in(
        &self,
        tx: &mut StoreTransaction<'_>,
        request: IssueTicketRequest,
        now: DateTime<Utc>,
    ) -> LotteryResult<Ticket> {
        if request.cost < 0 {
            return Err(LotteryError::InvalidAmount(request.cost));
        }
        let Some(&primary_draw) = request.draw_ids.first() else {
            return Err(LotteryError::InvalidRequest(
                "a ticket must be bound to at least one draw".to_string(),
            ));
        };

        let ticket_id = Uuid::new_v4();
        let mut participations = Vec::with_capacity(request.draw_ids.len());
        for &draw_id in &request.draw_ids {
            let draw = self.draws.load_synced(tx, draw_id, now).await?;
            ensure_draw_accepts_tickets(&draw, request.tenant_id, &request.game_code, now)?;
            if let Some(template_id) = request.template_id {
                if !draws::template_allowed(&*tx, draw_id, template_id)? {
                    return Err(LotteryError::TemplateNotAllowed { draw_id, template_id });
                }
            }
            participations.push(TicketDraw::pending(ticket_id, draw_id, request.tenant_id, now));
        }

        let ticket = Ticket {
            id: ticket_id,
            tenant_id: request.tenant_id,
            game_code: request.game_code,
            member_id: request.member_id,
            campaign_id: request.campaign_id,
            template_id: request.template_id,
            draw_id: Some(primary_draw),
            play_type: None,
            status: SubmissionStatus::Unsubmitted,
            submitted_at: None,
            submitted_by: None,
            client_reference: None,
            note: None,
            total_cost: request.cost,
            lines: Vec::new(),
            created_at: now,
            cancelled_at: None,
            cancel_reason: None,
        };

        if ticket.total_cost > 0 {
            let balance = self
                .ledger
                .debit(
                    tx,
                    DebitRequest {
                        tenant_id: ticket.tenant_id,
                        member_id: ticket.member_id,
                        amount: ticket.total_cost,
                        reference_type: "lottery_ticket".to_string(),
                        reference_id: ticket.id.to_string(),
                        remark: format!("{} ticket", ticket.game_code),
                    },
                )
                .await?;
            debug!(ticket_id = %ticket.id, balance, "Ticket cost debited");
        }

        tickets::stage(tx, &ticket)?;
        for participation in &participations {
            tickets::stage_participation(tx, participation)?;
        }

        info!(
            ticket_id = %ticket.id,
            member_id = ticket.member_id,
            draws = participations.len(),
            cost = ticket.total_cost,
            "Ticket issued"
        );
        Ok(ticket)
    }

    async fn submit_in(
        &self,
        tx: &mut StoreTransaction<'_>,
        request: SubmitNumbersRequest,
        now: DateTime<Utc>,
    ) -> LotteryResult<Ticket> {
        let mut ticket = tickets::require(&*tx, request.ticket_id)?;

        // 1. play type and number format
        let game = self.registry.game(&ticket.game_code)?;
        let rule = self.registry.rule_for_bet(&ticket.game_code, &request.play_type)?;
        if request.lines.is_empty() {
            return Err(LotteryError::EmptyBet);
        }
        for line in &request.lines {
            game.validate_numbers(line)?;
        }

        // 2. bound draws and template allow-list
        let mut participations = tickets::participations_for_ticket(&*tx, ticket.id)?;
        let primary_draw_id = ticket
            .draw_id
            .or_else(|| participations.first().map(|p| p.draw_id))
            .ok_or_else(|| LotteryError::InvalidRequest(format!("ticket {} is not bound to a draw", ticket.id)))?;

        let mut bound_draws: Vec<Draw> = Vec::with_capacity(participations.len());
        for participation in &participations {
            let draw = self.draws.load_synced(tx, participation.draw_id, now).await?;
            if let Some(template_id) = ticket.template_id {
                if !draws::template_allowed(&*tx, draw.id, template_id)? {
                    return Err(LotteryError::TemplateNotAllowed {
                        draw_id: draw.id,
                        template_id,
                    });
                }
            }
            bound_draws.push(draw);
        }
        let primary_draw = match bound_draws.iter().find(|d| d.id == primary_draw_id) {
            Some(draw) => draw.clone(),
            None => self.draws.load_synced(tx, primary_draw_id, now).await?,
        };

        // 3. entitlement and draw configuration
        self.entitlements
            .ensure_play_enabled(ticket.tenant_id, &ticket.game_code, &request.play_type)
            .await?;
        for draw in bound_draws.iter().chain(std::iter::once(&primary_draw)) {
            if !draw.allows_play_type(&request.play_type) {
                return Err(LotteryError::PlayTypeNotEnabledForDraw {
                    draw_id: draw.id,
                    play_type: request.play_type.clone(),
                });
            }
        }

        // 4. bet shape
        for line in &request.lines {
            rule.validate_bet(game, line)?;
        }

        // 5. policy
        if !primary_draw.accepts_bets(now) {
            return Err(LotteryError::DrawNotOpen {
                draw_id: primary_draw.id,
                status: primary_draw.status.to_string(),
            });
        }
        if ticket.status == SubmissionStatus::Cancelled {
            return Err(LotteryError::TicketCancelled(ticket.id));
        }

        // 6. guarded flip
        if ticket.is_submitted() {
            debug!(ticket_id = %ticket.id, "Rejected repeated submission");
            return Err(LotteryError::TicketAlreadySubmittedConflict(ticket.id));
        }
        ticket.status = SubmissionStatus::Submitted;
        ticket.play_type = Some(request.play_type);
        ticket.submitted_at = Some(now);
        ticket.submitted_by = request.submitted_by;
        ticket.client_reference = request.client_reference;
        ticket.note = request.note;

        // 7. lines
        ticket.lines = request
            .lines
            .into_iter()
            .enumerate()
            .map(|(index, mut numbers)| {
                numbers.sort_unstable();
                TicketLine {
                    index: index as u32,
                    numbers,
                }
            })
            .collect();
        tickets::stage(tx, &ticket)?;

        // 8. participations
        for participation in participations.iter_mut() {
            if let Some(draw) = bound_draws.iter().find(|d| d.id == participation.draw_id) {
                participation.activate_for(draw, now);
                tickets::stage_participation(tx, participation)?;
            }
        }

        info!(
            ticket_id = %ticket.id,
            draw_id = %primary_draw.id,
            play_type = ticket.play_type.as_deref().unwrap_or_default(),
            lines = ticket.lines.len(),
            "Ticket submitted"
        );
        Ok(ticket)
    }

    /// Cancel a ticket that has not reached any of its draw times. No refund is issued.
    pub async fn cancel_ticket(&self, ticket_id: Uuid, reason: &str) -> LotteryResult<Ticket> {
        let now = self.clock.now();
        let mut tx = self.storage.begin().await;
        let mut ticket = tickets::require(&tx, ticket_id)?;
        if ticket.status == SubmissionStatus::Cancelled {
            return Err(LotteryError::TicketCancelled(ticket_id));
        }

        let mut participations = tickets::participations_for_ticket(&tx, ticket_id)?;
        for participation in &participations {
            if participation.is_finalized() {
                return Err(LotteryError::TicketParticipationSettled {
                    ticket_id,
                    draw_id: participation.draw_id,
                    status: participation.status.to_string(),
                });
            }
            let draw = self.draws.load_synced(&mut tx, participation.draw_id, now).await?;
            if now >= draw.draw_at || draw.is_executed() {
                return Err(LotteryError::TicketCancelAfterDrawTime {
                    ticket_id,
                    draw_id: draw.id,
                });
            }
        }

        ticket.status = SubmissionStatus::Cancelled;
        ticket.cancelled_at = Some(now);
        ticket.cancel_reason = Some(reason.to_string());
        tickets::stage(&mut tx, &ticket)?;
        for participation in participations.iter_mut() {
            participation.status = ParticipationStatus::Cancelled;
            participation.updated_at = now;
            tickets::stage_participation(&mut tx, participation)?;
        }
        tx.commit()?;

        info!(ticket_id = %ticket.id, reason, "Ticket cancelled");
        Ok(ticket)
    }
}

/// Issuance guard, checked before any debit. Scheduled draws are accepted so
/// campaign tickets can be bound ahead of their sales window.
fn ensure_draw_accepts_tickets(draw: &Draw, tenant_id: TenantId, game_code: &str, now: DateTime<Utc>) -> LotteryResult<()> {
    match effective_status(now, draw) {
        DrawStatus::Settled => return Err(LotteryError::DrawAlreadySettled(draw.id)),
        DrawStatus::Cancelled => return Err(LotteryError::DrawCancelled(draw.id)),
        DrawStatus::SalesClosed => {
            return Err(LotteryError::DrawNotOpen {
                draw_id: draw.id,
                status: DrawStatus::SalesClosed.to_string(),
            })
        }
        DrawStatus::Scheduled | DrawStatus::SalesOpen => {}
    }
    if draw.tenant_id != tenant_id || draw.game_code != game_code {
        return Err(LotteryError::InvalidRequest(format!(
            "draw {} belongs to tenant {} game {}",
            draw.id, draw.tenant_id, draw.game_code
        )));
    }
    Ok(())
}
