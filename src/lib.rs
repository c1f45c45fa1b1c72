//! fairdraw - provably fair number-draw lottery core
//!
//! Draws commit to a secret seed hash before sales open, reveal the seed at
//! execution and derive the winning numbers deterministically from it. Tickets
//! are submitted at most once, settled into prize awards exactly once, and
//! awards are redeemed against an immutable cost snapshot.
//!
//! [`LotteryEngine`] is the entry point: it owns the RocksDB store, the rule
//! registry, the collaborators and every service.

pub mod adapters;
pub mod common;
pub mod config;
pub mod draw;
pub mod engine;
pub mod errors;
pub mod fairness;
pub mod games;
pub mod metrics;
pub mod prize;
pub mod settlement;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod ticket;

pub use config::{ConfigLoader, LotteryConfig};
pub use draw::{CreateDrawRequest, Draw, DrawStatus};
pub use engine::{LotteryEngine, LotteryEngineBuilder};
pub use errors::{ErrorKind, LotteryError, LotteryResult};
pub use games::{GameDefinition, RuleRegistry};
pub use prize::{AwardStatus, NewPrize, NewPrizeRule, PrizeAward, RedeemRecord};
pub use settlement::SettlementReport;
pub use ticket::{IssueTicketRequest, PlaceBetRequest, SubmitNumbersRequest, Ticket};
