//! The ledger event log.
//!
//! RULE: Every committed mutation appends exactly one event, inside the
//! same savepoint as the mutation. A rolled-back transaction leaves no
//! trace in the log.

use crate::{
    config::ConfigField,
    ticket_ledger::TicketStatus,
    types::{Amount, ComplaintId, Height, Principal, ProfileId, ProposalId, TicketId},
};
use serde::{Deserialize, Serialize};

/// Every event emitted by a committed transaction.
/// Variants are appended only. Never remove or reorder them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    // ── Profile events ─────────────────────────────
    ProfileMinted {
        profile_id: ProfileId,
        owner:      Principal,
    },
    ProfileTransferred {
        profile_id: ProfileId,
        from:       Principal,
        to:         Principal,
    },
    LoyaltyLevelUpdated {
        profile_id: ProfileId,
        level:      u64,
    },

    // ── Complaint events ───────────────────────────
    ComplaintLogged {
        profile_id:   ProfileId,
        complaint_id: ComplaintId,
    },
    ComplaintResolved {
        profile_id:   ProfileId,
        complaint_id: ComplaintId,
    },

    // ── Ticket events ──────────────────────────────
    TicketCreated {
        ticket_id:  TicketId,
        profile_id: ProfileId,
        owner:      Principal,
        cost:       Amount,
    },
    TicketStatusChanged {
        ticket_id: TicketId,
        status:    TicketStatus,
    },

    // ── Discount and config events ─────────────────
    DiscountApplied {
        ticket_id:       TicketId,
        discount:        Amount,
        discounted_cost: Amount,
    },
    ConfigUpdated {
        field: ConfigField,
        value: String,
    },

    // ── Reward events ──────────────────────────────
    RewardDistributed {
        profile_id:   ProfileId,
        ticket_id:    TicketId,
        recipient:    Principal,
        amount:       Amount,
        repair_count: u64,
    },

    // ── Governance events ──────────────────────────
    ProposalCreated {
        proposal_id: ProposalId,
        proposer:    Principal,
        end_height:  Height,
    },
    VoteCast {
        proposal_id: ProposalId,
        voter:       Principal,
        vote_yes:    bool,
    },
}

impl LedgerEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ProfileMinted { .. }       => "profile_minted",
            Self::ProfileTransferred { .. }  => "profile_transferred",
            Self::LoyaltyLevelUpdated { .. } => "loyalty_level_updated",
            Self::ComplaintLogged { .. }     => "complaint_logged",
            Self::ComplaintResolved { .. }   => "complaint_resolved",
            Self::TicketCreated { .. }       => "ticket_created",
            Self::TicketStatusChanged { .. } => "ticket_status_changed",
            Self::DiscountApplied { .. }     => "discount_applied",
            Self::ConfigUpdated { .. }       => "config_updated",
            Self::RewardDistributed { .. }   => "reward_distributed",
            Self::ProposalCreated { .. }     => "proposal_created",
            Self::VoteCast { .. }            => "vote_cast",
        }
    }

    /// The component that owns this event.
    pub fn component(&self) -> &'static str {
        match self {
            Self::ProfileMinted { .. }
            | Self::ProfileTransferred { .. }
            | Self::LoyaltyLevelUpdated { .. } => "profile",
            Self::ComplaintLogged { .. } | Self::ComplaintResolved { .. } => "complaint",
            Self::TicketCreated { .. } | Self::TicketStatusChanged { .. } => "ticket",
            Self::DiscountApplied { .. } | Self::ConfigUpdated { .. } => "discount",
            Self::RewardDistributed { .. } => "reward",
            Self::ProposalCreated { .. } | Self::VoteCast { .. } => "governance",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub height:     Height,
    pub component:  String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized LedgerEvent
}

impl EventLogEntry {
    pub fn decode(&self) -> serde_json::Result<LedgerEvent> {
        serde_json::from_str(&self.payload)
    }
}
