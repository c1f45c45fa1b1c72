use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::errors::{LotteryError, LotteryResult};

/// A number-draw game: how many numbers are drawn and from which range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameDefinition {
    pub code: String,
    pub name: String,
    /// Count of winning numbers drawn
    pub pick_count: usize,
    pub min_number: u8,
    pub max_number: u8,
}

impl GameDefinition {
    pub fn new(code: &str, name: &str, pick_count: usize, min_number: u8, max_number: u8) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            pick_count,
            min_number,
            max_number,
        }
    }

    pub fn range_size(&self) -> usize {
        (self.max_number as usize + 1).saturating_sub(self.min_number as usize)
    }

    pub fn contains(&self, number: u8) -> bool {
        number >= self.min_number && number <= self.max_number
    }

    /// Format check shared by every play type: non-empty, in range, no repeats
    pub fn validate_numbers(&self, numbers: &[u8]) -> LotteryResult<()> {
        if numbers.is_empty() {
            return Err(LotteryError::EmptyBet);
        }

        let mut seen = BTreeSet::new();
        for &number in numbers {
            if !self.contains(number) {
                return Err(LotteryError::NumberOutOfRange {
                    number,
                    min: self.min_number,
                    max: self.max_number,
                });
            }
            if !seen.insert(number) {
                return Err(LotteryError::DuplicateNumber(number));
            }
        }
        Ok(())
    }
}

/// Registry key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayKey {
    pub game_code: String,
    pub play_type: String,
}

impl PlayKey {
    pub fn new(game_code: &str, play_type: &str) -> Self {
        Self {
            game_code: game_code.to_string(),
            play_type: play_type.to_string(),
        }
    }
}

impl fmt::Display for PlayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.game_code, self.play_type)
    }
}

/// Named prize bracket reached by a specific match count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrizeTier {
    pub code: String,
    pub name: String,
    pub match_count: usize,
}

impl PrizeTier {
    pub fn new(code: &str, name: &str, match_count: usize) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            match_count,
        }
    }
}
