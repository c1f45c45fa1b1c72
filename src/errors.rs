//! Error types for the fairdraw lottery core
//!
//! Every domain operation returns [`LotteryResult`]. Business outcomes (validation
//! failures, state conflicts, missing records, integrity violations) are typed
//! variants carrying a stable code; infrastructure failures are wrapped separately
//! so callers can tell "try again" from "this request is invalid".

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::common::types::{MemberId, TenantId};

/// Coarse classification of a [`LotteryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any state change
    Validation,
    /// The request is well formed but the current state does not allow it
    Conflict,
    NotFound,
    /// A correctness guarantee would be broken (lost seed, bad commitment, misconfiguration)
    Integrity,
    /// Storage, seed store, ledger or deadline failure
    Infrastructure,
}

/// Root error type for all lottery operations
#[derive(Debug, thiserror::Error)]
pub enum LotteryError {
    // Validation
    #[error("Unknown game code: {0}")]
    InvalidGameCode(String),

    #[error("Unknown play type {play_type} for game {game_code}")]
    InvalidPlayType { game_code: String, play_type: String },

    #[error("Bet contains no numbers")]
    EmptyBet,

    #[error("Invalid number count: expected {expected}, got {actual}")]
    InvalidNumberCount { expected: String, actual: usize },

    #[error("Number {number} outside range {min}..={max}")]
    NumberOutOfRange { number: u8, min: u8, max: u8 },

    #[error("Number {0} chosen more than once")]
    DuplicateNumber(u8),

    #[error("Invalid sales window: {0}")]
    InvalidSalesWindow(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Game {game_code} is not enabled for tenant {tenant_id}")]
    GameNotEnabled { tenant_id: TenantId, game_code: String },

    #[error("Play type {play_type} of game {game_code} is not enabled for tenant {tenant_id}")]
    PlayTypeNotEnabled {
        tenant_id: TenantId,
        game_code: String,
        play_type: String,
    },

    #[error("Play type {play_type} is not enabled on draw {draw_id}")]
    PlayTypeNotEnabledForDraw { draw_id: Uuid, play_type: String },

    #[error("Ticket template {template_id} is not allowed on draw {draw_id}")]
    TemplateNotAllowed { draw_id: Uuid, template_id: Uuid },

    // State conflicts
    #[error("Draw {draw_id} is not open for sales (status {status})")]
    DrawNotOpen { draw_id: Uuid, status: String },

    #[error("Draw {draw_id} cannot be executed before {draw_at}")]
    DrawNotDue { draw_id: Uuid, draw_at: DateTime<Utc> },

    #[error("Draw {0} has already been settled")]
    DrawAlreadySettled(Uuid),

    #[error("Draw {0} has been cancelled")]
    DrawCancelled(Uuid),

    #[error("Draw {0} cannot be reopened outside its sales window")]
    DrawReopenWindowInvalid(Uuid),

    #[error("Draw {draw_id} is not closed (status {status})")]
    DrawNotClosed { draw_id: Uuid, status: String },

    #[error("Draw {0} has not been executed yet")]
    DrawNotExecuted(Uuid),

    #[error("Ticket {0} has already been submitted")]
    TicketAlreadySubmittedConflict(Uuid),

    #[error("Ticket {0} has been cancelled")]
    TicketCancelled(Uuid),

    #[error("Ticket {ticket_id} cannot be cancelled: draw {draw_id} has already taken place")]
    TicketCancelAfterDrawTime { ticket_id: Uuid, draw_id: Uuid },

    #[error("Ticket {ticket_id} cannot be cancelled: participation in draw {draw_id} is {status}")]
    TicketParticipationSettled {
        ticket_id: Uuid,
        draw_id: Uuid,
        status: String,
    },

    #[error("Participation of ticket {ticket_id} in draw {draw_id} cannot move to {target} before the draw is executed")]
    ParticipationNotSettleable {
        ticket_id: Uuid,
        draw_id: Uuid,
        target: String,
    },

    #[error("Award {award_id} cannot be redeemed (status {status})")]
    AwardNotRedeemable { award_id: Uuid, status: String },

    #[error("Award {0} has expired")]
    AwardExpired(Uuid),

    #[error("Prize {0} is not active")]
    PrizeInactive(Uuid),

    #[error("Prize rule for game {game_code} / match {match_count} overlaps active rule {existing_rule_id}")]
    PrizeRuleConflict {
        game_code: String,
        match_count: usize,
        existing_rule_id: Uuid,
    },

    #[error("Insufficient balance for member {member_id}: {balance} < {required}")]
    InsufficientBalance {
        member_id: MemberId,
        balance: i64,
        required: i64,
    },

    #[error("Member {0} is suspended")]
    MemberSuspended(MemberId),

    // Not found
    #[error("Draw not found: {0}")]
    DrawNotFound(Uuid),

    #[error("Ticket not found: {0}")]
    TicketNotFound(Uuid),

    #[error("Prize not found: {0}")]
    PrizeNotFound(Uuid),

    #[error("Prize rule not found: {0}")]
    PrizeRuleNotFound(Uuid),

    #[error("Prize award not found: {0}")]
    AwardNotFound(Uuid),

    #[error("Member account not found: tenant {tenant_id}, member {member_id}")]
    AccountNotFound { tenant_id: TenantId, member_id: MemberId },

    // Integrity
    #[error("Server seed for draw {0} is missing from the seed store")]
    ServerSeedMissing(Uuid),

    #[error("Revealed seed for draw {0} does not match the committed hash")]
    SeedHashMismatch(Uuid),

    #[error("No play rule registered for game {game_code} / play type {play_type}")]
    RuleNotRegistered { game_code: String, play_type: String },

    #[error("Winning number derivation failed: {0}")]
    DerivationFailed(String),

    // Infrastructure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Seed store unavailable: {0}")]
    SeedStoreUnavailable(String),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Operation {operation} did not complete within {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl LotteryError {
    /// Classification used by callers to branch on the failure
    pub fn kind(&self) -> ErrorKind {
        use LotteryError::*;
        match self {
            InvalidGameCode(_)
            | InvalidPlayType { .. }
            | EmptyBet
            | InvalidNumberCount { .. }
            | NumberOutOfRange { .. }
            | DuplicateNumber(_)
            | InvalidSalesWindow(_)
            | InvalidAmount(_)
            | InvalidRequest(_)
            | GameNotEnabled { .. }
            | PlayTypeNotEnabled { .. }
            | PlayTypeNotEnabledForDraw { .. }
            | TemplateNotAllowed { .. } => ErrorKind::Validation,

            DrawNotOpen { .. }
            | DrawNotDue { .. }
            | DrawAlreadySettled(_)
            | DrawCancelled(_)
            | DrawReopenWindowInvalid(_)
            | DrawNotClosed { .. }
            | DrawNotExecuted(_)
            | TicketAlreadySubmittedConflict(_)
            | TicketCancelled(_)
            | TicketCancelAfterDrawTime { .. }
            | TicketParticipationSettled { .. }
            | ParticipationNotSettleable { .. }
            | AwardNotRedeemable { .. }
            | AwardExpired(_)
            | PrizeInactive(_)
            | PrizeRuleConflict { .. }
            | InsufficientBalance { .. }
            | MemberSuspended(_) => ErrorKind::Conflict,

            DrawNotFound(_)
            | TicketNotFound(_)
            | PrizeNotFound(_)
            | PrizeRuleNotFound(_)
            | AwardNotFound(_)
            | AccountNotFound { .. } => ErrorKind::NotFound,

            ServerSeedMissing(_)
            | SeedHashMismatch(_)
            | RuleNotRegistered { .. }
            | DerivationFailed(_) => ErrorKind::Integrity,

            Storage(_)
            | Configuration(_)
            | SeedStoreUnavailable(_)
            | LedgerUnavailable(_)
            | Timeout { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Stable error code, safe to expose to API clients
    pub fn code(&self) -> &'static str {
        use LotteryError::*;
        match self {
            InvalidGameCode(_) => "InvalidGameCode",
            InvalidPlayType { .. } => "InvalidPlayType",
            EmptyBet => "EmptyBet",
            InvalidNumberCount { .. } => "InvalidNumberCount",
            NumberOutOfRange { .. } => "NumberOutOfRange",
            DuplicateNumber(_) => "DuplicateNumber",
            InvalidSalesWindow(_) => "InvalidSalesWindow",
            InvalidAmount(_) => "InvalidAmount",
            InvalidRequest(_) => "InvalidRequest",
            GameNotEnabled { .. } => "GameNotEnabled",
            PlayTypeNotEnabled { .. } => "PlayTypeNotEnabled",
            PlayTypeNotEnabledForDraw { .. } => "PlayTypeNotEnabledForDraw",
            TemplateNotAllowed { .. } => "TemplateNotAllowed",
            DrawNotOpen { .. } => "DrawNotOpen",
            DrawNotDue { .. } => "DrawNotDue",
            DrawAlreadySettled(_) => "DrawAlreadySettled",
            DrawCancelled(_) => "DrawCancelled",
            DrawReopenWindowInvalid(_) => "DrawReopenWindowInvalid",
            DrawNotClosed { .. } => "DrawNotClosed",
            DrawNotExecuted(_) => "DrawNotExecuted",
            TicketAlreadySubmittedConflict(_) => "TicketAlreadySubmittedConflict",
            TicketCancelled(_) => "TicketCancelled",
            TicketCancelAfterDrawTime { .. } => "TicketCancelAfterDrawTime",
            TicketParticipationSettled { .. } => "TicketParticipationSettled",
            ParticipationNotSettleable { .. } => "ParticipationNotSettleable",
            AwardNotRedeemable { .. } => "AwardNotRedeemable",
            AwardExpired(_) => "AwardExpired",
            PrizeInactive(_) => "PrizeInactive",
            PrizeRuleConflict { .. } => "PrizeRuleConflict",
            InsufficientBalance { .. } => "InsufficientBalance",
            MemberSuspended(_) => "MemberSuspended",
            DrawNotFound(_) => "DrawNotFound",
            TicketNotFound(_) => "TicketNotFound",
            PrizeNotFound(_) => "PrizeNotFound",
            PrizeRuleNotFound(_) => "PrizeRuleNotFound",
            AwardNotFound(_) => "AwardNotFound",
            AccountNotFound { .. } => "AccountNotFound",
            ServerSeedMissing(_) => "ServerSeedMissing",
            SeedHashMismatch(_) => "SeedHashMismatch",
            RuleNotRegistered { .. } => "RuleNotRegistered",
            DerivationFailed(_) => "DerivationFailed",
            Storage(_) => "StorageFailure",
            Configuration(_) => "ConfigurationFailure",
            SeedStoreUnavailable(_) => "SeedStoreUnavailable",
            LedgerUnavailable(_) => "LedgerUnavailable",
            Timeout { .. } => "Timeout",
        }
    }

    /// Infrastructure failures may succeed on retry; business failures never will
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Infrastructure
    }
}

/// Storage system errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Metrics registry error: {0}")]
    Metrics(String),
}

impl From<rocksdb::Error> for LotteryError {
    fn from(e: rocksdb::Error) -> Self {
        LotteryError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for LotteryError {
    fn from(e: serde_json::Error) -> Self {
        LotteryError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

impl From<prometheus::Error> for LotteryError {
    fn from(e: prometheus::Error) -> Self {
        LotteryError::Configuration(ConfigurationError::Metrics(e.to_string()))
    }
}

// Convenience type alias for Results
pub type LotteryResult<T> = Result<T, LotteryError>;
