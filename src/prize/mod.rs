//! Prize catalog, prize rules, awards and redemption

pub mod catalog;
pub mod model;
pub mod redemption;

pub use catalog::{resolve_rule, NewPrize, NewPrizeRule, PrizeCatalog};
pub use model::{AwardStatus, Prize, PrizeAward, PrizeRule, PrizeSnapshot, RedeemRecord};
pub use redemption::RedemptionService;
