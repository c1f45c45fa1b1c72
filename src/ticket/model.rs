use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::common::types::{MemberId, TenantId};
use crate::draw::Draw;
use crate::errors::{LotteryError, LotteryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Unsubmitted,
    Submitted,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipationStatus {
    Pending,
    Active,
    Invalid,
    Settled,
    Redeemed,
    Cancelled,
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParticipationStatus::Pending => "Pending",
            ParticipationStatus::Active => "Active",
            ParticipationStatus::Invalid => "Invalid",
            ParticipationStatus::Settled => "Settled",
            ParticipationStatus::Redeemed => "Redeemed",
            ParticipationStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// One bet line; numbers are stored sorted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketLine {
    pub index: u32,
    pub numbers: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub game_code: String,
    pub member_id: MemberId,
    pub campaign_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    /// Primary draw; a ticket may participate in more draws through [`TicketDraw`]
    pub draw_id: Option<Uuid>,
    pub play_type: Option<String>,
    pub status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submitted_by: Option<String>,
    pub client_reference: Option<String>,
    pub note: Option<String>,
    pub total_cost: i64,
    /// Written once at submission
    pub lines: Vec<TicketLine>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

impl Ticket {
    pub fn is_submitted(&self) -> bool {
        self.status == SubmissionStatus::Submitted || !self.lines.is_empty()
    }
}

/// A ticket's participation in one draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraw {
    pub ticket_id: Uuid,
    pub draw_id: Uuid,
    pub tenant_id: TenantId,
    pub status: ParticipationStatus,
    pub updated_at: DateTime<Utc>,
}

impl TicketDraw {
    pub fn pending(ticket_id: Uuid, draw_id: Uuid, tenant_id: TenantId, now: DateTime<Utc>) -> Self {
        Self {
            ticket_id,
            draw_id,
            tenant_id,
            status: ParticipationStatus::Pending,
            updated_at: now,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(
            self.status,
            ParticipationStatus::Settled | ParticipationStatus::Redeemed
        )
    }

    /// Active when the draw is selling right now, Invalid otherwise
    pub fn activate_for(&mut self, draw: &Draw, now: DateTime<Utc>) {
        self.status = if draw.accepts_bets(now) {
            ParticipationStatus::Active
        } else {
            ParticipationStatus::Invalid
        };
        self.updated_at = now;
    }

    pub fn mark_settled(&mut self, draw: &Draw, now: DateTime<Utc>) -> LotteryResult<()> {
        self.finalize(draw, ParticipationStatus::Settled, now)
    }

    pub fn mark_redeemed(&mut self, draw: &Draw, now: DateTime<Utc>) -> LotteryResult<()> {
        self.finalize(draw, ParticipationStatus::Redeemed, now)
    }

    fn finalize(&mut self, draw: &Draw, target: ParticipationStatus, now: DateTime<Utc>) -> LotteryResult<()> {
        if !draw.is_executed() {
            return Err(LotteryError::ParticipationNotSettleable {
                ticket_id: self.ticket_id,
                draw_id: self.draw_id,
                target: target.to_string(),
            });
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_participation_needs_executed_draw() {
        let now = Utc::now();
        let mut draw = Draw::new(
            1,
            "lotto",
            now - Duration::minutes(30),
            now - Duration::minutes(5),
            now,
            vec![],
            now - Duration::hours(1),
        );
        let mut participation = TicketDraw::pending(Uuid::new_v4(), draw.id, 1, now);

        let err = participation.mark_settled(&draw, now).unwrap_err();
        assert_eq!(err.code(), "ParticipationNotSettleable");
        assert_eq!(participation.status, ParticipationStatus::Pending);

        draw.winning_numbers = Some(vec![1, 2, 3, 4, 5, 6]);
        participation.mark_settled(&draw, now).unwrap();
        assert_eq!(participation.status, ParticipationStatus::Settled);
        assert!(participation.is_finalized());
    }

    #[test]
    fn test_activation_depends_on_sales_window() {
        let now = Utc::now();
        let open = Draw::new(1, "lotto", now - Duration::minutes(1), now + Duration::minutes(9), now + Duration::minutes(10), vec![], now);
        let closed = Draw::new(1, "lotto", now - Duration::minutes(10), now - Duration::minutes(1), now + Duration::minutes(1), vec![], now);

        let mut participation = TicketDraw::pending(Uuid::new_v4(), open.id, 1, now);
        participation.activate_for(&open, now);
        assert_eq!(participation.status, ParticipationStatus::Active);

        participation.activate_for(&closed, now);
        assert_eq!(participation.status, ParticipationStatus::Invalid);
    }
}
