//! Play rule strategies
//!
//! Each play type decides the allowed bet shape and maps a bet plus the
//! winning numbers to at most one prize tier.

use crate::common::types::match_count;
use crate::errors::{LotteryError, LotteryResult};
use crate::games::types::{GameDefinition, PlayKey, PrizeTier};

pub trait PlayRule: Send + Sync {
    fn key(&self) -> &PlayKey;

    /// Ordered from best to worst
    fn tiers(&self) -> &[PrizeTier];

    /// Bet shape check; number format is validated by [`GameDefinition::validate_numbers`]
    fn validate_bet(&self, game: &GameDefinition, numbers: &[u8]) -> LotteryResult<()>;

    fn tier_for_matches(&self, matched: usize) -> Option<&PrizeTier> {
        self.tiers().iter().find(|tier| tier.match_count == matched)
    }

    fn evaluate(&self, numbers: &[u8], winning: &[u8]) -> Option<&PrizeTier> {
        self.tier_for_matches(match_count(numbers, winning))
    }
}

fn sorted_tiers(mut tiers: Vec<PrizeTier>) -> Vec<PrizeTier> {
    tiers.sort_by(|a, b| b.match_count.cmp(&a.match_count));
    tiers
}

/// Pick exactly as many numbers as are drawn
pub struct StraightRule {
    key: PlayKey,
    tiers: Vec<PrizeTier>,
}

impl StraightRule {
    pub fn new(game_code: &str, tiers: Vec<PrizeTier>) -> Self {
        Self {
            key: PlayKey::new(game_code, "straight"),
            tiers: sorted_tiers(tiers),
        }
    }
}

impl PlayRule for StraightRule {
    fn key(&self) -> &PlayKey {
        &self.key
    }

    fn tiers(&self) -> &[PrizeTier] {
        &self.tiers
    }

    fn validate_bet(&self, game: &GameDefinition, numbers: &[u8]) -> LotteryResult<()> {
        if numbers.len() != game.pick_count {
            return Err(LotteryError::InvalidNumberCount {
                expected: game.pick_count.to_string(),
                actual: numbers.len(),
            });
        }
        Ok(())
    }
}

/// Pick a fixed number of numbers, fewer than are drawn
pub struct PartialPickRule {
    key: PlayKey,
    picks: usize,
    tiers: Vec<PrizeTier>,
}

impl PartialPickRule {
    pub fn new(game_code: &str, play_type: &str, picks: usize, tiers: Vec<PrizeTier>) -> Self {
        Self {
            key: PlayKey::new(game_code, play_type),
            picks,
            tiers: sorted_tiers(tiers),
        }
    }
}

impl PlayRule for PartialPickRule {
    fn key(&self) -> &PlayKey {
        &self.key
    }

    fn tiers(&self) -> &[PrizeTier] {
        &self.tiers
    }

    fn validate_bet(&self, game: &GameDefinition, numbers: &[u8]) -> LotteryResult<()> {
        if self.picks >= game.pick_count || numbers.len() != self.picks {
            return Err(LotteryError::InvalidNumberCount {
                expected: self.picks.to_string(),
                actual: numbers.len(),
            });
        }
        Ok(())
    }
}

/// Pick more numbers than are drawn; the match count can never exceed the draw size
pub struct SystemRule {
    key: PlayKey,
    min_picks: usize,
    max_picks: usize,
    tiers: Vec<PrizeTier>,
}

impl SystemRule {
    pub fn new(game_code: &str, min_picks: usize, max_picks: usize, tiers: Vec<PrizeTier>) -> Self {
        Self {
            key: PlayKey::new(game_code, "system"),
            min_picks,
            max_picks,
            tiers: sorted_tiers(tiers),
        }
    }
}

impl PlayRule for SystemRule {
    fn key(&self) -> &PlayKey {
        &self.key
    }

    fn tiers(&self) -> &[PrizeTier] {
        &self.tiers
    }

    fn validate_bet(&self, game: &GameDefinition, numbers: &[u8]) -> LotteryResult<()> {
        let count = numbers.len();
        if count <= game.pick_count || count < self.min_picks || count > self.max_picks {
            return Err(LotteryError::InvalidNumberCount {
                expected: format!("{}..={}", self.min_picks, self.max_picks),
                actual: count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lotto() -> GameDefinition {
        GameDefinition::new("lotto", "Lotto 6/49", 6, 1, 49)
    }

    fn tiers() -> Vec<PrizeTier> {
        vec![
            PrizeTier::new("match3", "Three numbers", 3),
            PrizeTier::new("match6", "Jackpot", 6),
            PrizeTier::new("match4", "Four numbers", 4),
        ]
    }

    #[test]
    fn test_tiers_sorted_best_first() {
        let rule = StraightRule::new("lotto", tiers());
        let counts: Vec<usize> = rule.tiers().iter().map(|t| t.match_count).collect();
        assert_eq!(counts, vec![6, 4, 3]);
    }

    #[test]
    fn test_straight_shape() {
        let rule = StraightRule::new("lotto", tiers());
        assert!(rule.validate_bet(&lotto(), &[1, 2, 3, 4, 5, 6]).is_ok());
        assert!(matches!(
            rule.validate_bet(&lotto(), &[1, 2, 3, 4, 5]),
            Err(LotteryError::InvalidNumberCount { actual: 5, .. })
        ));
    }

    #[test]
    fn test_partial_and_system_shapes() {
        let pick3 = PartialPickRule::new("lotto", "pick3", 3, vec![PrizeTier::new("p3", "All three", 3)]);
        assert!(pick3.validate_bet(&lotto(), &[7, 8, 9]).is_ok());
        assert!(pick3.validate_bet(&lotto(), &[7, 8]).is_err());

        let system = SystemRule::new("lotto", 7, 10, tiers());
        assert!(system.validate_bet(&lotto(), &[1, 2, 3, 4, 5, 6, 7]).is_ok());
        assert!(system.validate_bet(&lotto(), &[1, 2, 3, 4, 5, 6]).is_err());
        assert!(system
            .validate_bet(&lotto(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11])
            .is_err());
    }

    #[test]
    fn test_evaluate_resolves_tier() {
        let rule = StraightRule::new("lotto", tiers());
        let winning = [3, 11, 19, 27, 35, 43];

        let tier = rule.evaluate(&[3, 11, 19, 27, 1, 2], &winning).unwrap();
        assert_eq!(tier.code, "match4");

        assert!(rule.evaluate(&[3, 11, 1, 2, 4, 5], &winning).is_none());
        assert_eq!(rule.evaluate(&winning, &winning).unwrap().code, "match6");
    }
}
