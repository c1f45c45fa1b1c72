use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::common::types::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawStatus {
    Scheduled,
    SalesOpen,
    SalesClosed,
    Settled,
    Cancelled,
}

impl DrawStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DrawStatus::Settled | DrawStatus::Cancelled)
    }
}

impl fmt::Display for DrawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DrawStatus::Scheduled => "Scheduled",
            DrawStatus::SalesOpen => "SalesOpen",
            DrawStatus::SalesClosed => "SalesClosed",
            DrawStatus::Settled => "Settled",
            DrawStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// One scheduled drawing of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub game_code: String,
    pub sales_open_at: DateTime<Utc>,
    pub sales_close_at: DateTime<Utc>,
    pub draw_at: DateTime<Utc>,
    pub status: DrawStatus,

    pub manually_closed: bool,
    pub manual_close_reason: Option<String>,
    pub manually_closed_at: Option<DateTime<Utc>>,

    /// Published before the first bet; `sha256(server_seed)`
    pub server_seed_hash: Option<String>,
    /// Revealed at execution
    pub server_seed: Option<String>,
    pub derivation_algorithm: Option<String>,
    pub derivation_input: Option<String>,
    pub winning_numbers: Option<Vec<u8>>,

    /// Empty means every play type of the game
    pub enabled_play_types: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub reopened_at: Option<DateTime<Utc>>,
}

impl Draw {
    pub fn new(
        tenant_id: TenantId,
        game_code: &str,
        sales_open_at: DateTime<Utc>,
        sales_close_at: DateTime<Utc>,
        draw_at: DateTime<Utc>,
        enabled_play_types: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            game_code: game_code.to_string(),
            sales_open_at,
            sales_close_at,
            draw_at,
            status: DrawStatus::Scheduled,
            manually_closed: false,
            manual_close_reason: None,
            manually_closed_at: None,
            server_seed_hash: None,
            server_seed: None,
            derivation_algorithm: None,
            derivation_input: None,
            winning_numbers: None,
            enabled_play_types,
            created_at: now,
            executed_at: None,
            cancelled_at: None,
            cancel_reason: None,
            reopened_at: None,
        }
    }

    pub fn is_executed(&self) -> bool {
        self.winning_numbers.is_some()
    }

    pub fn in_sales_window(&self, now: DateTime<Utc>) -> bool {
        self.sales_open_at <= now && now < self.sales_close_at
    }

    pub fn allows_play_type(&self, play_type: &str) -> bool {
        self.enabled_play_types.is_empty() || self.enabled_play_types.iter().any(|p| p == play_type)
    }

    /// True when sales are open right now, judged by status and window together
    pub fn accepts_bets(&self, now: DateTime<Utc>) -> bool {
        effective_status(now, self) == DrawStatus::SalesOpen
    }
}

/// Status a draw should have at `now`.
///
/// Settled and Cancelled are sticky, as is a manual close. Otherwise the
/// status follows the sales window.
pub fn effective_status(now: DateTime<Utc>, draw: &Draw) -> DrawStatus {
    if draw.status.is_terminal() {
        return draw.status;
    }
    if draw.manually_closed {
        return DrawStatus::SalesClosed;
    }
    if now < draw.sales_open_at {
        DrawStatus::Scheduled
    } else if now < draw.sales_close_at {
        DrawStatus::SalesOpen
    } else {
        DrawStatus::SalesClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(now: DateTime<Utc>) -> Draw {
        Draw::new(
            1,
            "lotto",
            now + Duration::minutes(10),
            now + Duration::minutes(50),
            now + Duration::minutes(60),
            vec![],
            now,
        )
    }

    #[test]
    fn test_effective_status_follows_window() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let draw = sample(t0);

        assert_eq!(effective_status(t0, &draw), DrawStatus::Scheduled);
        assert_eq!(effective_status(t0 + Duration::minutes(10), &draw), DrawStatus::SalesOpen);
        assert_eq!(effective_status(t0 + Duration::minutes(49), &draw), DrawStatus::SalesOpen);
        assert_eq!(effective_status(t0 + Duration::minutes(50), &draw), DrawStatus::SalesClosed);
        assert_eq!(effective_status(t0 + Duration::days(3), &draw), DrawStatus::SalesClosed);
    }

    #[test]
    fn test_terminal_and_manual_close_are_sticky() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let inside = t0 + Duration::minutes(20);

        let mut draw = sample(t0);
        draw.manually_closed = true;
        assert_eq!(effective_status(inside, &draw), DrawStatus::SalesClosed);

        let mut draw = sample(t0);
        draw.status = DrawStatus::Cancelled;
        assert_eq!(effective_status(inside, &draw), DrawStatus::Cancelled);

        draw.status = DrawStatus::Settled;
        assert_eq!(effective_status(t0, &draw), DrawStatus::Settled);
    }

    #[test]
    fn test_play_type_filter() {
        let t0 = Utc::now();
        let mut draw = sample(t0);
        assert!(draw.allows_play_type("system"));

        draw.enabled_play_types = vec!["straight".to_string()];
        assert!(draw.allows_play_type("straight"));
        assert!(!draw.allows_play_type("system"));
    }
}
