use crate::ids::MemberId;
use crate::side::Side;

/// Failure taxonomy for tree and account operations.
/// Every variant is scoped to one request; none is fatal to the process.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid sponsor code")]
    SponsorNotFound(String),

    #[error("No available position")]
    PositionUnavailable { attempts: u32 },

    /// Lost the race for a discovered slot. Recovered by retrying placement.
    #[error("slot {side} of member {parent} is already occupied")]
    SlotOccupied { parent: MemberId, side: Side },

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    AuthFailure,

    #[error("{0}")]
    NotFound(String),

    /// Persistence fault. The detail is for logs only.
    #[error("storage error: {0}")]
    Storage(String),
}

impl TreeError {
    /// Stable classification string for responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::SponsorNotFound(_) => "sponsor_not_found",
            Self::PositionUnavailable { .. } => "position_unavailable",
            Self::SlotOccupied { .. } => "slot_occupied",
            Self::Conflict(_) => "conflict",
            Self::AuthFailure => "auth_failure",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Message safe to hand to a caller. Never carries raw storage text.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "Database error".to_string(),
            Self::SlotOccupied { .. } => "No available position".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SlotOccupied { .. })
    }
}
