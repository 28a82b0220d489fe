//! Governance voting: stake-gated proposals and one-shot votes.
//!
//! Proposals never change after creation except for their tallies. A vote
//! record's existence is what blocks a second vote from the same voter.

use crate::{
    error::{LedgerError, LedgerResult},
    event::LedgerEvent,
    external::TokenLedger,
    store::{require, LedgerStore},
    types::{Amount, Height, Principal, ProposalId},
};
use serde::{Deserialize, Serialize};

pub const PROPOSAL_COUNTER: &str = "proposal";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposalRecord {
    pub proposal_id: ProposalId,
    pub proposer:    Principal,
    pub description: String,
    pub yes_votes:   u64,
    pub no_votes:    u64,
    pub end_height:  Height,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteRecord {
    pub proposal_id: ProposalId,
    pub voter:       Principal,
    pub vote_yes:    bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Open,
    Passed,
    Rejected,
}

impl ProposalRecord {
    /// Open until `end_height`; afterwards passed on a strict yes majority.
    pub fn status_at(&self, height: Height) -> ProposalStatus {
        if height < self.end_height {
            ProposalStatus::Open
        } else if self.yes_votes > self.no_votes {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Rejected
        }
    }
}

pub struct GovernanceVoting<'a> {
    store:     &'a LedgerStore,
    tokens:    &'a dyn TokenLedger,
    min_stake: Amount,
    height:    Height,
}

impl<'a> GovernanceVoting<'a> {
    pub fn new(
        store: &'a LedgerStore,
        tokens: &'a dyn TokenLedger,
        min_stake: Amount,
        height: Height,
    ) -> Self {
        Self { store, tokens, min_stake, height }
    }

    fn ensure_stake(&self, caller: &Principal, action: &'static str) -> LedgerResult<()> {
        if self.tokens.balance_of(caller) < self.min_stake {
            return Err(LedgerError::NotAuthorized { caller: caller.clone(), action });
        }
        Ok(())
    }

    /// Open a proposal that accepts votes for `duration` heights.
    pub fn create_proposal(
        &self,
        caller: &Principal,
        description: &str,
        duration: Height,
    ) -> LedgerResult<ProposalId> {
        self.ensure_stake(caller, "create proposal")?;
        let height = self.height;
        let end_height = height
            .checked_add(duration)
            .ok_or(LedgerError::ArithmeticOverflow { context: "proposal end height" })?;
        let proposal_id = self.store.atomic(|store| {
            let proposal_id = store.next_id(PROPOSAL_COUNTER)?;
            store.insert_proposal(&ProposalRecord {
                proposal_id,
                proposer: caller.clone(),
                description: description.to_string(),
                yes_votes: 0,
                no_votes: 0,
                end_height,
            })?;
            store.append_event(
                height,
                &LedgerEvent::ProposalCreated { proposal_id, proposer: caller.clone(), end_height },
            )?;
            Ok(proposal_id)
        })?;
        log::info!("height={height} governance: {caller} opened proposal {proposal_id} until {end_height}");
        Ok(proposal_id)
    }

    /// Cast the caller's single vote on an open proposal.
    pub fn vote(&self, caller: &Principal, proposal_id: ProposalId, vote_yes: bool) -> LedgerResult<()> {
        let height = self.height;
        self.store.atomic(|store| {
            let proposal = require(store.get_proposal(proposal_id)?, "proposal", proposal_id)?;
            if height >= proposal.end_height {
                return Err(LedgerError::ProposalEnded {
                    proposal_id,
                    end_height: proposal.end_height,
                });
            }
            if store.get_vote(proposal_id, caller)?.is_some() {
                return Err(LedgerError::AlreadyVoted { proposal_id, voter: caller.clone() });
            }
            self.ensure_stake(caller, "vote")?;

            store.tally_vote(proposal_id, vote_yes)?;
            store.insert_vote(&VoteRecord { proposal_id, voter: caller.clone(), vote_yes })?;
            store.append_event(
                height,
                &LedgerEvent::VoteCast { proposal_id, voter: caller.clone(), vote_yes },
            )
        })?;
        log::debug!("height={height} governance: {caller} voted {vote_yes} on {proposal_id}");
        Ok(())
    }

    pub fn get_proposal(&self, proposal_id: ProposalId) -> LedgerResult<ProposalRecord> {
        require(self.store.get_proposal(proposal_id)?, "proposal", proposal_id)
    }

    pub fn proposal_status(&self, proposal_id: ProposalId) -> LedgerResult<ProposalStatus> {
        Ok(self.get_proposal(proposal_id)?.status_at(self.height))
    }

    pub fn has_voted(&self, proposal_id: ProposalId, voter: &Principal) -> LedgerResult<bool> {
        Ok(self.store.get_vote(proposal_id, voter)?.is_some())
    }

    pub fn get_vote(&self, proposal_id: ProposalId, voter: &Principal) -> LedgerResult<Option<VoteRecord>> {
        self.store.get_vote(proposal_id, voter)
    }

    pub fn proposal_count(&self) -> LedgerResult<i64> {
        self.store.proposal_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(yes: u64, no: u64) -> ProposalRecord {
        ProposalRecord {
            proposal_id: 1,
            proposer:    "alice".into(),
            description: "lower decay period".into(),
            yes_votes:   yes,
            no_votes:    no,
            end_height:  100,
        }
    }

    #[test]
    fn status_follows_deadline_then_majority() {
        assert_eq!(proposal(5, 0).status_at(99), ProposalStatus::Open);
        assert_eq!(proposal(5, 0).status_at(100), ProposalStatus::Passed);
        assert_eq!(proposal(2, 2).status_at(100), ProposalStatus::Rejected);
        assert_eq!(proposal(0, 0).status_at(500), ProposalStatus::Rejected);
    }
}
