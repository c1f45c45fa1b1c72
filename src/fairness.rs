//! Fairness engine: commit-reveal seed handling and winning number derivation.
//!
//! A draw publishes `sha256(seed)` before any bet is accepted and reveals the
//! seed only when it executes. The winning numbers are a pure function of the
//! draw id and the seed, so anyone holding the revealed fields can recompute
//! them.

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::{LotteryError, LotteryResult};
use crate::games::GameDefinition;

pub const DERIVATION_ALGORITHM: &str = "sha256-ctr-v1";

const SEED_BYTES: usize = 32;
const MAX_DERIVATION_ROUNDS: u64 = 10_000;

/// Output of [`generate_winning_numbers`], written onto the draw as proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningNumbers {
    /// Sorted ascending
    pub numbers: Vec<u8>,
    pub algorithm: String,
    pub input: String,
}

/// Fresh 256-bit secret, hex encoded
pub fn create_server_seed() -> String {
    let mut bytes = [0u8; SEED_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Public commitment for a seed
pub fn compute_server_seed_hash(seed: &str) -> String {
    hex::encode(Sha256::digest(seed.as_bytes()))
}

pub fn derivation_input(draw_id: Uuid, seed: &str) -> String {
    format!("{}:{}", draw_id, seed)
}

pub fn generate_winning_numbers(
    draw_id: Uuid,
    seed: &str,
    game: &GameDefinition,
) -> LotteryResult<WinningNumbers> {
    let range = game.range_size() as u64;
    if range == 0 || game.pick_count == 0 || game.pick_count as u64 > range {
        return Err(LotteryError::DerivationFailed(format!(
            "game {} cannot draw {} numbers from {}..={}",
            game.code, game.pick_count, game.min_number, game.max_number
        )));
    }

    let input = derivation_input(draw_id, seed);
    // Words at or above this bound would skew `word % range` towards low values
    let zone = u64::MAX - (u64::MAX % range);

    let mut numbers: Vec<u8> = Vec::with_capacity(game.pick_count);
    for counter in 0..MAX_DERIVATION_ROUNDS {
        let digest = Sha256::digest(format!("{}:{}", input, counter).as_bytes());

        for chunk in digest.chunks_exact(8) {
            let mut word_bytes = [0u8; 8];
            word_bytes.copy_from_slice(chunk);
            let word = u64::from_be_bytes(word_bytes);
            if word >= zone {
                continue;
            }

            let number = game.min_number + (word % range) as u8;
            if !numbers.contains(&number) {
                numbers.push(number);
            }
            if numbers.len() == game.pick_count {
                numbers.sort_unstable();
                return Ok(WinningNumbers {
                    numbers,
                    algorithm: DERIVATION_ALGORITHM.to_string(),
                    input,
                });
            }
        }
    }

    Err(LotteryError::DerivationFailed(format!(
        "no result for draw {} after {} rounds",
        draw_id, MAX_DERIVATION_ROUNDS
    )))
}

/// Recompute a draw's proof from its published fields.
///
/// Fails with `SeedHashMismatch` when the seed does not match the commitment
/// or the recorded numbers differ from what the seed produces.
pub fn verify_reveal(
    draw_id: Uuid,
    seed: &str,
    committed_hash: &str,
    recorded_numbers: &[u8],
    game: &GameDefinition,
) -> LotteryResult<WinningNumbers> {
    if compute_server_seed_hash(seed) != committed_hash {
        return Err(LotteryError::SeedHashMismatch(draw_id));
    }

    let derived = generate_winning_numbers(draw_id, seed, game)?;
    let mut recorded = recorded_numbers.to_vec();
    recorded.sort_unstable();
    if derived.numbers != recorded {
        return Err(LotteryError::SeedHashMismatch(draw_id));
    }
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lotto() -> GameDefinition {
        GameDefinition::new("lotto", "Lotto 6/49", 6, 1, 49)
    }

    #[test]
    fn test_seed_shape_and_uniqueness() {
        let a = create_server_seed();
        let b = create_server_seed();
        assert_eq!(a.len(), SEED_BYTES * 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_commitment_is_sha256_hex() {
        // sha256("abc")
        assert_eq!(
            compute_server_seed_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let seed = create_server_seed();
        assert_eq!(compute_server_seed_hash(&seed), compute_server_seed_hash(&seed));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let draw_id = Uuid::new_v4();
        let seed = create_server_seed();

        let first = generate_winning_numbers(draw_id, &seed, &lotto()).unwrap();
        let second = generate_winning_numbers(draw_id, &seed, &lotto()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.algorithm, DERIVATION_ALGORITHM);
        assert_eq!(first.input, format!("{}:{}", draw_id, seed));
    }

    #[test]
    fn test_derived_numbers_are_valid() {
        let game = lotto();
        for _ in 0..50 {
            let result = generate_winning_numbers(Uuid::new_v4(), &create_server_seed(), &game).unwrap();
            assert_eq!(result.numbers.len(), 6);
            assert!(result.numbers.windows(2).all(|w| w[0] < w[1]));
            assert!(result.numbers.iter().all(|n| game.contains(*n)));
        }
    }

    #[test]
    fn test_full_range_pick() {
        let game = GameDefinition::new("all", "Everything", 10, 0, 9);
        let result = generate_winning_numbers(Uuid::new_v4(), "seed", &game).unwrap();
        assert_eq!(result.numbers, (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn test_impossible_game_rejected() {
        let game = GameDefinition::new("bad", "Bad", 7, 1, 5);
        let err = generate_winning_numbers(Uuid::new_v4(), "seed", &game).unwrap_err();
        assert_eq!(err.code(), "DerivationFailed");
    }

    #[test]
    fn test_verify_reveal() {
        let draw_id = Uuid::new_v4();
        let seed = create_server_seed();
        let hash = compute_server_seed_hash(&seed);
        let result = generate_winning_numbers(draw_id, &seed, &lotto()).unwrap();

        assert!(verify_reveal(draw_id, &seed, &hash, &result.numbers, &lotto()).is_ok());

        let other_seed = create_server_seed();
        assert!(matches!(
            verify_reveal(draw_id, &other_seed, &hash, &result.numbers, &lotto()),
            Err(LotteryError::SeedHashMismatch(_))
        ));

        let mut tampered = result.numbers.clone();
        tampered[0] = if tampered[0] == 49 { 48 } else { 49 };
        tampered.dedup();
        assert!(verify_reveal(draw_id, &seed, &hash, &tampered, &lotto()).is_err());
    }
}
