//! Rule registry
//!
//! Built once at startup and shared read-only. Lookups for user supplied play
//! types fail with a validation error; lookups from settlement fail with an
//! integrity error because a settled ticket can only reference a rule that
//! existed at submission time.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{LotteryError, LotteryResult};
use crate::games::rules::{PartialPickRule, PlayRule, StraightRule, SystemRule};
use crate::games::types::{GameDefinition, PlayKey, PrizeTier};

pub struct RuleRegistry {
    games: HashMap<String, GameDefinition>,
    rules: HashMap<PlayKey, Arc<dyn PlayRule>>,
}

impl RuleRegistry {
    pub fn builder() -> RuleRegistryBuilder {
        RuleRegistryBuilder::default()
    }

    /// Built-in games: `lotto` (6 of 1..=49) and `daily5` (5 of 1..=36)
    pub fn standard() -> Self {
        let lotto_tiers = vec![
            PrizeTier::new("match6", "Jackpot", 6),
            PrizeTier::new("match5", "Second prize", 5),
            PrizeTier::new("match4", "Third prize", 4),
            PrizeTier::new("match3", "Fourth prize", 3),
        ];
        let daily_tiers = vec![
            PrizeTier::new("match5", "Top prize", 5),
            PrizeTier::new("match4", "Second prize", 4),
            PrizeTier::new("match3", "Third prize", 3),
        ];

        Self::builder()
            .game(GameDefinition::new("lotto", "Lotto 6/49", 6, 1, 49))
            .rule(StraightRule::new("lotto", lotto_tiers.clone()))
            .rule(SystemRule::new("lotto", 7, 10, lotto_tiers))
            .rule(PartialPickRule::new(
                "lotto",
                "pick3",
                3,
                vec![
                    PrizeTier::new("pick3_all", "All three", 3),
                    PrizeTier::new("pick3_two", "Two of three", 2),
                ],
            ))
            .game(GameDefinition::new("daily5", "Daily 5/36", 5, 1, 36))
            .rule(StraightRule::new("daily5", daily_tiers.clone()))
            .rule(SystemRule::new("daily5", 6, 8, daily_tiers))
            .build()
    }

    pub fn game(&self, game_code: &str) -> LotteryResult<&GameDefinition> {
        self.games
            .get(game_code)
            .ok_or_else(|| LotteryError::InvalidGameCode(game_code.to_string()))
    }

    pub fn find(&self, game_code: &str, play_type: &str) -> Option<&dyn PlayRule> {
        self.rules
            .get(&PlayKey::new(game_code, play_type))
            .map(|rule| rule.as_ref())
    }

    /// Lookup for a caller-supplied play type
    pub fn rule_for_bet(&self, game_code: &str, play_type: &str) -> LotteryResult<&dyn PlayRule> {
        self.find(game_code, play_type)
            .ok_or_else(|| LotteryError::InvalidPlayType {
                game_code: game_code.to_string(),
                play_type: play_type.to_string(),
            })
    }

    /// Lookup for a play type already persisted on a ticket
    pub fn rule(&self, game_code: &str, play_type: &str) -> LotteryResult<&dyn PlayRule> {
        self.find(game_code, play_type)
            .ok_or_else(|| LotteryError::RuleNotRegistered {
                game_code: game_code.to_string(),
                play_type: play_type.to_string(),
            })
    }

    pub fn play_types(&self, game_code: &str) -> Vec<String> {
        let mut types: Vec<String> = self
            .rules
            .keys()
            .filter(|key| key.game_code == game_code)
            .map(|key| key.play_type.clone())
            .collect();
        types.sort();
        types
    }

    pub fn games(&self) -> impl Iterator<Item = &GameDefinition> {
        self.games.values()
    }
}

#[derive(Default)]
pub struct RuleRegistryBuilder {
    games: HashMap<String, GameDefinition>,
    rules: HashMap<PlayKey, Arc<dyn PlayRule>>,
}

impl RuleRegistryBuilder {
    pub fn game(mut self, game: GameDefinition) -> Self {
        self.games.insert(game.code.clone(), game);
        self
    }

    pub fn rule<R: PlayRule + 'static>(mut self, rule: R) -> Self {
        self.rules.insert(rule.key().clone(), Arc::new(rule));
        self
    }

    pub fn build(self) -> RuleRegistry {
        RuleRegistry {
            games: self.games,
            rules: self.rules,
        }
    }
}
