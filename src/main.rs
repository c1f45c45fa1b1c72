//! fairdraw command line
//!
//! `init-config` writes a sample configuration, `simulate` runs one complete
//! draw against a throw-away store, `verify` recomputes an executed draw's proof.

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use fairdraw::{
    common::{Clock, ManualClock},
    config::generate_sample_config,
    errors::LotteryResult,
    telemetry, ConfigLoader, CreateDrawRequest, LotteryConfig, LotteryEngine, LotteryError, NewPrize,
    NewPrizeRule, PlaceBetRequest,
};

/// Provably fair lottery core
#[derive(Parser)]
#[command(name = "fairdraw")]
#[command(about = "Provably fair number-draw lottery")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory, overrides the configuration
    #[arg(short, long)]
    data_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample configuration file
    InitConfig {
        #[arg(short, long, default_value = "fairdraw.toml")]
        output: String,
    },

    /// Run one draw end to end with random bets
    Simulate {
        /// Number of tickets to place
        #[arg(short, long, default_value = "200")]
        tickets: usize,

        /// Number of distinct members placing them
        #[arg(short, long, default_value = "20")]
        members: u64,

        /// Game code from the built-in registry
        #[arg(short, long, default_value = "lotto")]
        game: String,
    },

    /// Recompute the commitment and winning numbers of an executed draw
    Verify {
        #[arg(long)]
        draw_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> LotteryResult<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { output } = &cli.command {
        generate_sample_config(output)?;
        println!("Sample configuration written to {}", output);
        return Ok(());
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_directory = dir;
    }
    telemetry::init_tracing(&config.monitoring);

    match cli.command {
        Commands::InitConfig { .. } => Ok(()),
        Commands::Simulate { tickets, members, game } => run_simulation(config, tickets, members.max(1), &game).await,
        Commands::Verify { draw_id } => run_verify(config, draw_id),
    }
}

async fn run_simulation(mut config: LotteryConfig, tickets: usize, members: u64, game_code: &str) -> LotteryResult<()> {
    const TENANT: u64 = 1;
    const TICKET_COST: i64 = 200;

    config.storage.clear_on_start = true;
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = LotteryEngine::builder(config).clock(clock.clone()).build()?;
    let game = engine.registry().game(game_code)?.clone();

    let start = clock.now();
    let draw = engine
        .create_draw(CreateDrawRequest {
            tenant_id: TENANT,
            game_code: game.code.clone(),
            sales_open_at: start,
            sales_close_at: start + Duration::minutes(50),
            draw_at: start + Duration::minutes(60),
            enabled_play_types: vec!["straight".to_string()],
        })
        .await?;
    println!("Draw {} committed to seed hash {}", draw.id, draw.server_seed_hash.as_deref().unwrap_or("-"));

    for match_count in (game.pick_count.saturating_sub(3).max(1))..=game.pick_count {
        let prize = engine
            .create_prize(NewPrize {
                name: format!("{} match {}", game.code, match_count),
                description: None,
                cost: 1_000 * (match_count as i64).pow(3),
                redeem_window_days: Some(30),
            })
            .await?;
        engine
            .create_prize_rule(NewPrizeRule {
                game_code: game.code.clone(),
                match_count,
                prize_id: prize.id,
                effective_from: start - Duration::days(1),
                effective_to: None,
            })
            .await?;
    }

    let ledger = engine
        .store_ledger()
        .cloned()
        .ok_or_else(|| LotteryError::LedgerUnavailable("simulation needs the built-in ledger".to_string()))?;
    for member in 1..=members {
        ledger.deposit(TENANT, member, TICKET_COST * tickets as i64).await?;
    }

    let mut rng = rand::thread_rng();
    let mut placed = 0usize;
    for _ in 0..tickets {
        let numbers: Vec<u8> = rand::seq::index::sample(&mut rng, game.range_size(), game.pick_count)
            .into_iter()
            .map(|i| game.min_number + i as u8)
            .collect();
        let member_id = rng.gen_range(1..=members);

        engine
            .place_bet(PlaceBetRequest {
                tenant_id: TENANT,
                member_id,
                game_code: game.code.clone(),
                draw_id: Some(draw.id),
                play_type: "straight".to_string(),
                lines: vec![numbers],
                cost: TICKET_COST,
                client_reference: None,
                note: None,
            })
            .await?;
        placed += 1;
        clock.advance(Duration::milliseconds(100));
    }
    println!("Placed {} tickets", placed);

    clock.set(draw.draw_at);
    let executed = engine.execute_draw(draw.id).await?;
    println!(
        "Winning numbers {:?} (seed {})",
        executed.winning_numbers.unwrap_or_default(),
        executed.server_seed.as_deref().unwrap_or("-")
    );

    let report = engine.settle_draw(draw.id).await?;
    println!(
        "Settlement: {} tickets, {} lines, {} awards",
        report.tickets_scanned, report.lines_evaluated, report.awards_created
    );

    let rerun = engine.settle_draw(draw.id).await?;
    println!("Re-settlement created {} new awards", rerun.awards_created);

    if let Some(award) = engine.awards_for_draw(draw.id)?.first() {
        let record = engine.redeem(award.id, Some("simulation".to_string())).await?;
        println!("Redeemed award {} for {}", award.id, record.cost_snapshot);
    }

    let verification = engine.verify_draw(draw.id)?;
    println!("Verified with {} over input {}", verification.algorithm, verification.input);
    print!("{}", engine.metrics().render()?);
    Ok(())
}

fn run_verify(config: LotteryConfig, draw_id: Uuid) -> LotteryResult<()> {
    let engine = LotteryEngine::builder(config).build()?;
    let verification = engine.verify_draw(draw_id)?;

    println!("Draw:            {}", verification.draw_id);
    println!("Seed hash:       {}", verification.server_seed_hash);
    println!("Revealed seed:   {}", verification.server_seed);
    println!("Algorithm:       {}", verification.algorithm);
    println!("Input:           {}", verification.input);
    println!("Winning numbers: {:?}", verification.winning_numbers);
    println!("Commitment and numbers verified");
    Ok(())
}
