//! Shared primitive types used across the entire ledger.

/// A ledger height. Advanced only between transactions by the caller
/// driving the engine; never by a component.
pub type Height = u64;

/// An identity able to initiate operations and hold balances or ownership.
pub type Principal = String;

/// Token and cost amounts. All arithmetic on these is integer.
pub type Amount = u64;

pub type ProfileId = u64;
pub type TicketId = u64;
pub type ComplaintId = u64;
pub type ProposalId = u64;
