use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::common::types::{MemberId, TenantId};

/// Catalog entry a winning line can be awarded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Cost in minor currency units
    pub cost: i64,
    /// How long an award stays redeemable; `None` means forever
    pub redeem_window_days: Option<u32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Maps a match count of one game to a prize for a validity window.
/// Not scoped by play type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeRule {
    pub id: Uuid,
    pub game_code: String,
    pub match_count: usize,
    pub prize_id: Uuid,
    pub effective_from: DateTime<Utc>,
    /// Exclusive; `None` is open ended
    pub effective_to: Option<DateTime<Utc>>,
    pub active: bool,
}

impl PrizeRule {
    pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
        self.active && self.effective_from <= at && self.effective_to.map_or(true, |to| at < to)
    }

    /// Whether two rules for the same (game, match count) would both apply at some instant
    pub fn overlaps(&self, other: &PrizeRule) -> bool {
        if !self.active || !other.active {
            return false;
        }
        if self.game_code != other.game_code || self.match_count != other.match_count {
            return false;
        }
        let self_starts_before_other_ends = other.effective_to.map_or(true, |to| self.effective_from < to);
        let other_starts_before_self_ends = self.effective_to.map_or(true, |to| other.effective_from < to);
        self_starts_before_other_ends && other_starts_before_self_ends
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwardStatus {
    Awarded,
    Redeemed,
    Expired,
    Cancelled,
}

impl fmt::Display for AwardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AwardStatus::Awarded => "Awarded",
            AwardStatus::Redeemed => "Redeemed",
            AwardStatus::Expired => "Expired",
            AwardStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Prize fields frozen at award time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeSnapshot {
    pub name: String,
    pub cost: i64,
    pub redeem_window_days: Option<u32>,
    pub description: Option<String>,
}

impl From<&Prize> for PrizeSnapshot {
    fn from(prize: &Prize) -> Self {
        Self {
            name: prize.name.clone(),
            cost: prize.cost,
            redeem_window_days: prize.redeem_window_days,
            description: prize.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeAward {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub member_id: MemberId,
    pub draw_id: Uuid,
    pub ticket_id: Uuid,
    pub line_index: u32,
    pub matched: usize,
    pub tier_code: Option<String>,
    pub prize_rule_id: Uuid,
    pub prize_id: Uuid,
    pub snapshot: PrizeSnapshot,
    pub status: AwardStatus,
    pub awarded_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl PrizeAward {
    pub fn expiry_for(awarded_at: DateTime<Utc>, snapshot: &PrizeSnapshot) -> Option<DateTime<Utc>> {
        snapshot
            .redeem_window_days
            .map(|days| awarded_at + Duration::days(i64::from(days)))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// Proof of redemption with the cost as it was at that moment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemRecord {
    pub id: Uuid,
    pub award_id: Uuid,
    pub tenant_id: TenantId,
    pub member_id: MemberId,
    pub prize_id: Uuid,
    pub cost_snapshot: i64,
    pub redeemed_by: Option<String>,
    pub redeemed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rule(from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> PrizeRule {
        PrizeRule {
            id: Uuid::new_v4(),
            game_code: "lotto".to_string(),
            match_count: 6,
            prize_id: Uuid::new_v4(),
            effective_from: from,
            effective_to: to,
            active: true,
        }
    }

    #[test]
    fn test_rule_window() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let r = rule(jan, Some(feb));

        assert!(r.is_effective_at(jan));
        assert!(!r.is_effective_at(feb));
        assert!(!r.is_effective_at(jan - Duration::seconds(1)));
    }

    #[test]
    fn test_rule_overlap() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mar = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        assert!(!rule(jan, Some(feb)).overlaps(&rule(feb, Some(mar))));
        assert!(rule(jan, Some(mar)).overlaps(&rule(feb, None)));
        assert!(rule(jan, None).overlaps(&rule(mar, None)));

        let mut other_count = rule(jan, None);
        other_count.match_count = 5;
        assert!(!rule(jan, None).overlaps(&other_count));

        let mut inactive = rule(jan, None);
        inactive.active = false;
        assert!(!rule(jan, None).overlaps(&inactive));
    }

    #[test]
    fn test_award_expiry() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let snapshot = PrizeSnapshot {
            name: "Voucher".to_string(),
            cost: 500,
            redeem_window_days: Some(30),
            description: None,
        };
        assert_eq!(PrizeAward::expiry_for(at, &snapshot), Some(at + Duration::days(30)));

        let forever = PrizeSnapshot { redeem_window_days: None, ..snapshot };
        assert_eq!(PrizeAward::expiry_for(at, &forever), None);
    }
}
