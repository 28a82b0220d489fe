use crate::types::{Height, Principal, ProfileId, ProposalId, TicketId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Caller '{caller}' is not authorized for {action}")]
    NotAuthorized { caller: Principal, action: &'static str },

    #[error("Caller '{caller}' does not own profile {profile_id}")]
    NotOwner { caller: Principal, profile_id: ProfileId },

    #[error("Caller '{caller}' is not the owner of profile {profile_id}")]
    NotProfileOwner { caller: Principal, profile_id: ProfileId },

    #[error("No {entity} with id {id}")]
    InvalidId { entity: &'static str, id: u64 },

    #[error("Invalid value {value} for {field}")]
    InvalidParam { field: &'static str, value: String },

    #[error("Discount on ticket {ticket_id} would raise cost {base_cost} to {discounted_cost}")]
    DiscountApplicationFailed {
        ticket_id: TicketId,
        base_cost: u64,
        discounted_cost: u64,
    },

    #[error("'{voter}' already voted on proposal {proposal_id}")]
    AlreadyVoted { proposal_id: ProposalId, voter: Principal },

    #[error("Proposal {proposal_id} ended at height {end_height}")]
    ProposalEnded { proposal_id: ProposalId, end_height: Height },

    #[error("Batch of {len} tickets exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    #[error("Height cannot move backwards: current {current}, requested {requested}")]
    HeightRegression { current: Height, requested: Height },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LedgerError {
    /// True when the ledger refused the call and nothing was written.
    /// False for storage and encoding failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Serialization(_) | Self::Other(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
