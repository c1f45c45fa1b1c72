//! Games, play rules and the rule registry
//!
//! A play rule is looked up by (game code, play-type code). Settlement only
//! talks to the [`PlayRule`] trait, so new play types plug in through the
//! registry without touching settlement.

pub mod registry;
pub mod rules;
pub mod types;

pub use registry::{RuleRegistry, RuleRegistryBuilder};
pub use rules::{PartialPickRule, PlayRule, StraightRule, SystemRule};
pub use types::{GameDefinition, PlayKey, PrizeTier};
