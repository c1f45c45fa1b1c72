//! In-process implementations of the collaborator traits
//!
//! Good enough for a single node and for tests. A deployment with a shared
//! cache or an external wallet supplies its own implementations to
//! [`LotteryEngineBuilder`](crate::engine::LotteryEngineBuilder).

pub mod entitlements;
pub mod ledger;
pub mod seed_store;

pub use entitlements::StaticEntitlements;
pub use ledger::StoreLedger;
pub use seed_store::InMemorySeedStore;
