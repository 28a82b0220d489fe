use crate::{
    ticket_ledger::TicketStatus,
    types::{Amount, ComplaintId, Height, Principal, ProfileId, ProposalId, TicketId},
};
use serde::{Deserialize, Serialize};

/// Every mutating operation, as data.
/// Variants are appended only. Never remove or reorder them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum LedgerCommand {
    // ── Profiles ──────────────────────────────────
    MintProfile { owner: Principal },
    TransferProfile { profile_id: ProfileId, recipient: Principal },
    UpdateLoyaltyLevel { profile_id: ProfileId, level: u64 },

    // ── Complaints ────────────────────────────────
    LogComplaint { profile_id: ProfileId, description: String },
    ResolveComplaint { profile_id: ProfileId, complaint_id: ComplaintId },

    // ── Tickets ───────────────────────────────────
    CreateTicket { profile_id: ProfileId, description: String, cost: Amount },
    ResolveTicket { ticket_id: TicketId, status: TicketStatus },

    // ── Discounts and config ──────────────────────
    ApplyDiscount { ticket_id: TicketId },
    BatchApplyDiscounts { ticket_ids: Vec<TicketId> },
    SetMaxDiscount { value: u64 },
    SetComplaintThreshold { value: u64 },
    SetDecayPeriod { value: Height },
    SetDecayFactor { value: u64 },
    TransferOwnership { new_owner: Principal },

    // ── Rewards ───────────────────────────────────
    DistributeReward { profile_id: ProfileId, ticket_id: TicketId },

    // ── Governance ────────────────────────────────
    CreateProposal { description: String, duration: Height },
    Vote { proposal_id: ProposalId, vote_yes: bool },
}

impl LedgerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MintProfile { .. }           => "mint_profile",
            Self::TransferProfile { .. }       => "transfer_profile",
            Self::UpdateLoyaltyLevel { .. }    => "update_loyalty_level",
            Self::LogComplaint { .. }          => "log_complaint",
            Self::ResolveComplaint { .. }      => "resolve_complaint",
            Self::CreateTicket { .. }          => "create_ticket",
            Self::ResolveTicket { .. }         => "resolve_ticket",
            Self::ApplyDiscount { .. }         => "apply_discount",
            Self::BatchApplyDiscounts { .. }   => "batch_apply_discounts",
            Self::SetMaxDiscount { .. }        => "set_max_discount",
            Self::SetComplaintThreshold { .. } => "set_complaint_threshold",
            Self::SetDecayPeriod { .. }        => "set_decay_period",
            Self::SetDecayFactor { .. }        => "set_decay_factor",
            Self::TransferOwnership { .. }     => "transfer_ownership",
            Self::DistributeReward { .. }      => "distribute_reward",
            Self::CreateProposal { .. }        => "create_proposal",
            Self::Vote { .. }                  => "vote",
        }
    }
}

/// What a committed command produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    ProfileMinted { profile_id: ProfileId },
    ComplaintLogged { complaint_id: ComplaintId },
    TicketCreated { ticket_id: TicketId },
    DiscountApplied { discounted_cost: Amount },
    BatchApplied { total_discount: Amount },
    RewardDistributed { amount: Amount },
    ProposalCreated { proposal_id: ProposalId },
    Done,
}

/// A command stamped with the height and caller it runs under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledCommand {
    pub height:  Height,
    pub caller:  Principal,
    pub command: LedgerCommand,
}
