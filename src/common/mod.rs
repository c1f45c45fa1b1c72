//! Common types and collaborator interfaces
//!
//! Shared identifiers, the injectable clock, and the traits for the external
//! collaborators the core calls (seed store, ledger, entitlements).

pub mod clock;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use traits::{DebitRequest, Entitlements, Ledger, SeedStore};
pub use types::{MemberId, TenantId};
