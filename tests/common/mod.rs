//! Shared setup for the integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use fairdraw::common::{ManualClock, SeedStore};
use fairdraw::prize::{Prize, PrizeRule};
use fairdraw::{
    CreateDrawRequest, Draw, LotteryConfig, LotteryEngine, LotteryEngineBuilder, NewPrize, NewPrizeRule,
    PlaceBetRequest,
};

pub const TENANT: u64 = 1;

pub struct Harness {
    pub engine: LotteryEngine,
    pub clock: Arc<ManualClock>,
    _dir: TempDir,
}

/// Fixed start of every test timeline
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn harness() -> Harness {
    harness_with(|_| {}, |builder| builder)
}

pub fn harness_with(
    configure: impl FnOnce(&mut LotteryConfig),
    customize: impl FnOnce(LotteryEngineBuilder) -> LotteryEngineBuilder,
) -> Harness {
    fairdraw::telemetry::init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut config = LotteryConfig::for_testing(dir.path().to_str().unwrap());
    configure(&mut config);

    let clock = Arc::new(ManualClock::new(t0()));
    let builder = LotteryEngine::builder(config).clock(clock.clone());
    let engine = customize(builder).build().unwrap();
    Harness {
        engine,
        clock,
        _dir: dir,
    }
}

impl Harness {
    /// Draw selling from t0 to t0+50m, drawn at t0+60m
    pub async fn open_draw(&self, game_code: &str) -> Draw {
        self.draw_with(game_code, Duration::zero(), Vec::new()).await
    }

    pub async fn draw_with(&self, game_code: &str, open_offset: Duration, play_types: Vec<&str>) -> Draw {
        let start = t0() + open_offset;
        self.engine
            .create_draw(CreateDrawRequest {
                tenant_id: TENANT,
                game_code: game_code.to_string(),
                sales_open_at: start,
                sales_close_at: start + Duration::minutes(50),
                draw_at: start + Duration::minutes(60),
                enabled_play_types: play_types.into_iter().map(String::from).collect(),
            })
            .await
            .unwrap()
    }

    pub async fn fund(&self, member_id: u64, amount: i64) {
        self.engine
            .store_ledger()
            .unwrap()
            .deposit(TENANT, member_id, amount)
            .await
            .unwrap();
    }

    pub fn balance(&self, member_id: u64) -> i64 {
        self.engine.store_ledger().unwrap().balance(TENANT, member_id).unwrap()
    }

    /// Prize for `match_count` hits, effective from a day before t0
    pub async fn prize_for(&self, game_code: &str, match_count: usize, cost: i64) -> (Prize, PrizeRule) {
        let prize = self
            .engine
            .create_prize(NewPrize {
                name: format!("{} match {}", game_code, match_count),
                description: None,
                cost,
                redeem_window_days: Some(30),
            })
            .await
            .unwrap();
        let rule = self
            .engine
            .create_prize_rule(NewPrizeRule {
                game_code: game_code.to_string(),
                match_count,
                prize_id: prize.id,
                effective_from: t0() - Duration::days(1),
                effective_to: None,
            })
            .await
            .unwrap();
        (prize, rule)
    }

    /// Seed held by the in-memory store, readable before the reveal in tests only
    pub async fn peek_seed(&self, draw_id: Uuid) -> String {
        self.engine
            .memory_seed_store()
            .unwrap()
            .get(draw_id)
            .await
            .unwrap()
            .unwrap()
    }

    /// Numbers the draw will produce once executed
    pub async fn future_winning_numbers(&self, draw: &Draw) -> Vec<u8> {
        let seed = self.peek_seed(draw.id).await;
        let game = self.engine.registry().game(&draw.game_code).unwrap();
        fairdraw::fairness::generate_winning_numbers(draw.id, &seed, game)
            .unwrap()
            .numbers
    }
}

pub fn bet(draw: &Draw, member_id: u64, play_type: &str, lines: Vec<Vec<u8>>, cost: i64) -> PlaceBetRequest {
    PlaceBetRequest {
        tenant_id: TENANT,
        member_id,
        game_code: draw.game_code.clone(),
        draw_id: Some(draw.id),
        play_type: play_type.to_string(),
        lines,
        cost,
        client_reference: None,
        note: None,
    }
}

/// Numbers of the game's range that are not in `winning`, in ascending order
pub fn losing_numbers(winning: &[u8], count: usize, max: u8) -> Vec<u8> {
    (1..=max).filter(|n| !winning.contains(n)).take(count).collect()
}
