use async_trait::async_trait;
use std::collections::HashMap;

use crate::common::{Entitlements, TenantId};
use crate::config::TenantEntitlementConfig;
use crate::errors::{LotteryError, LotteryResult};

/// Entitlements fixed at startup from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticEntitlements {
    allow_all: bool,
    /// tenant -> game -> play types (empty = all play types)
    tenants: HashMap<TenantId, HashMap<String, Vec<String>>>,
}

impl StaticEntitlements {
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            tenants: HashMap::new(),
        }
    }

    /// An empty list grants everything to everyone
    pub fn from_config(entries: &[TenantEntitlementConfig]) -> Self {
        if entries.is_empty() {
            return Self::allow_all();
        }

        let tenants = entries
            .iter()
            .map(|entry| {
                let games = entry
                    .games
                    .iter()
                    .map(|g| (g.game_code.clone(), g.play_types.clone()))
                    .collect();
                (entry.tenant_id, games)
            })
            .collect();

        Self {
            allow_all: false,
            tenants,
        }
    }

    fn game_entry(&self, tenant_id: TenantId, game_code: &str) -> Option<&Vec<String>> {
        self.tenants.get(&tenant_id).and_then(|games| games.get(game_code))
    }
}

#[async_trait]
impl Entitlements for StaticEntitlements {
    async fn ensure_game_enabled(&self, tenant_id: TenantId, game_code: &str) -> LotteryResult<()> {
        if self.allow_all || self.game_entry(tenant_id, game_code).is_some() {
            return Ok(());
        }
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
        if self.allow_all {
            return Ok(());
        }
        match self.game_entry(tenant_id, game_code) {
            Some(plays) if plays.is_empty() || plays.iter().any(|p| p == play_type) => Ok(()),
            _ => Err(LotteryError::PlayTypeNotEnabled {
                tenant_id,
                game_code: game_code.to_string(),
                play_type: play_type.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameEntitlementConfig;

    #[tokio::test]
    async fn test_configured_entitlements() {
        let gate = StaticEntitlements::from_config(&[TenantEntitlementConfig {
            tenant_id: 1,
            games: vec![
                GameEntitlementConfig {
                    game_code: "lotto".to_string(),
                    play_types: vec!["straight".to_string()],
                },
                GameEntitlementConfig {
                    game_code: "daily5".to_string(),
                    play_types: vec![],
                },
            ],
        }]);

        assert!(gate.ensure_game_enabled(1, "lotto").await.is_ok());
        assert!(gate.ensure_play_enabled(1, "lotto", "straight").await.is_ok());
        assert!(gate.ensure_play_enabled(1, "daily5", "system").await.is_ok());

        let err = gate.ensure_play_enabled(1, "lotto", "system").await.unwrap_err();
        assert_eq!(err.code(), "PlayTypeNotEnabled");
        let err = gate.ensure_game_enabled(2, "lotto").await.unwrap_err();
        assert_eq!(err.code(), "GameNotEnabled");
    }

    #[tokio::test]
    async fn test_empty_config_allows_everything() {
        let gate = StaticEntitlements::from_config(&[]);
        assert!(gate.ensure_play_enabled(99, "anything", "any").await.is_ok());
    }
}
