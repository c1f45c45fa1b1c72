//! Collaborator interfaces
//!
//! The lottery core calls these services but does not own their internals.
//! In-process implementations live in [`crate::adapters`].

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::common::types::{MemberId, TenantId};
use crate::errors::LotteryResult;
use crate::storage::StoreTransaction;

/// Short-lived secret store holding each draw's server seed between commit and reveal.
///
/// Written once when sales open, read once when the draw executes.
#[async_trait]
pub trait SeedStore: Send + Sync {
    async fn store(&self, draw_id: Uuid, seed: &str, ttl: Duration) -> LotteryResult<()>;

    /// `Ok(None)` when the seed expired or was never stored
    async fn get(&self, draw_id: Uuid) -> LotteryResult<Option<String>>;
}

/// Debit instruction sent to the ledger
#[derive(Debug, Clone)]
pub struct DebitRequest {
    pub tenant_id: TenantId,
    pub member_id: MemberId,
    pub amount: i64,
    pub reference_type: String,
    pub reference_id: String,
    pub remark: String,
}

/// Member balance ledger.
///
/// The debit is staged into the caller's transaction so that a ticket and its
/// payment commit together or not at all.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Returns the balance after the debit
    async fn debit(&self, tx: &mut StoreTransaction<'_>, request: DebitRequest) -> LotteryResult<i64>;
}

/// Tenant-level feature gates
#[async_trait]
pub trait Entitlements: Send + Sync {
    async fn ensure_game_enabled(&self, tenant_id: TenantId, game_code: &str) -> LotteryResult<()>;

    async fn ensure_play_enabled(
        &self,
        tenant_id: TenantId,
        game_code: &str,
        play_type: &str,
    ) -> LotteryResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LotteryError;

    struct DenyAll;

    #[async_trait]
    impl Entitlements for DenyAll {
        async fn ensure_game_enabled(&self, tenant_id: TenantId, game_code: &str) -> LotteryResult<()> {
            Err(LotteryError::GameNotEnabled {
                tenant_id,
                game_code: game_code.to_string(),
            })
        }

        async fn ensure_play_enabled(
            &self,
            tenant_id: TenantId,
            game_code: &str,
            play_type: &str,
        ) -> LotteryResult<()> {
            Err(LotteryError::PlayTypeNotEnabled {
                tenant_id,
                game_code: game_code.to_string(),
                play_type: play_type.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_entitlements_are_object_safe() {
        let gate: Box<dyn Entitlements> = Box::new(DenyAll);
        let err = gate.ensure_game_enabled(1, "lotto").await.unwrap_err();
        assert_eq!(err.code(), "GameNotEnabled");
    }
}
