//! Ticket aggregate and its participations in draws

pub mod model;
pub mod service;

pub use model::{ParticipationStatus, SubmissionStatus, Ticket, TicketDraw, TicketLine};
pub use service::{IssueTicketRequest, PlaceBetRequest, SubmitNumbersRequest, TicketService};
