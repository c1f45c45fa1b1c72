//! Draw aggregate
//!
//! Status is never advanced by a timer. Every operation that touches a draw
//! recomputes [`effective_status`] first and persists a change before going on.

pub mod model;
pub mod service;

pub use model::{effective_status, Draw, DrawStatus};
pub use service::{CreateDrawRequest, DrawService, DrawVerification};
