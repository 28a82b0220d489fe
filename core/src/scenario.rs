//! Seeded workload generation and replay.
//!
//! A `ScenarioGenerator` produces a stream of `ScheduledCommand`s that
//! exercises every component: customers mint profiles and open tickets,
//! the business resolves them and pays rewards, complaints come and go,
//! and stakeholders propose and vote. The generator tracks the ids the
//! ledger will assign so most commands are valid, but it makes no
//! attempt to avoid rejections. Rejected commands are part of the workload.
//!
//! Same seed, same config, same command list. Replaying the same list
//! into two fresh engines yields identical event logs.

use crate::{
    command::{LedgerCommand, ScheduledCommand},
    config::LedgerConfig,
    engine::LedgerEngine,
    error::LedgerResult,
    external::InMemoryTokenLedger,
    rng::{ScenarioRng, ScenarioStream},
    ticket_ledger::TicketStatus,
    types::{Amount, ComplaintId, Height, Principal, ProfileId, TicketId},
};
use serde::{Deserialize, Serialize};

/// Customers in every generated scenario.
pub const CUSTOMER_COUNT: usize = 6;

/// Customers holding governance stake at genesis. The rest must earn it
/// through repair rewards before they can propose or vote.
pub const STAKED_CUSTOMERS: usize = 4;

/// Largest gap between consecutive commands.
const MAX_HEIGHT_STEP: u64 = 15;

pub struct ScenarioGenerator {
    workload:  ScenarioRng,
    heights:   ScenarioRng,
    business:  Principal,
    customers: Vec<Principal>,
    min_stake: Amount,
    height:    Height,
    /// Predicted owner of profile `i + 1`.
    profile_owners: Vec<Principal>,
    /// Predicted complaint total per profile, same indexing.
    complaint_totals: Vec<u64>,
    open_complaints: Vec<(ProfileId, ComplaintId)>,
    /// `(ticket_id, profile_id)` for ticket `i + 1`.
    tickets: Vec<(TicketId, ProfileId)>,
    proposals_opened: u64,
}

impl ScenarioGenerator {
    pub fn new(seed: u64, config: &LedgerConfig) -> Self {
        let customers = (0..CUSTOMER_COUNT).map(|i| format!("customer-{i}")).collect();
        Self {
            workload: ScenarioRng::new(seed, ScenarioStream::Workload as u64),
            heights: ScenarioRng::new(seed, ScenarioStream::Heights as u64),
            business: config.owner.clone(),
            customers,
            min_stake: config.min_stake,
            height: 0,
            profile_owners: Vec::new(),
            complaint_totals: Vec::new(),
            open_complaints: Vec::new(),
            tickets: Vec::new(),
            proposals_opened: 0,
        }
    }

    pub fn customers(&self) -> &[Principal] {
        &self.customers
    }

    /// Opening token balances the workload assumes.
    pub fn stakeholders(&self) -> Vec<(Principal, Amount)> {
        self.customers
            .iter()
            .take(STAKED_CUSTOMERS)
            .map(|c| (c.clone(), self.min_stake))
            .collect()
    }

    /// A token ledger seeded with [`Self::stakeholders`].
    pub fn token_ledger(&self) -> InMemoryTokenLedger {
        self.stakeholders()
            .iter()
            .fold(InMemoryTokenLedger::new(), |ledger, (who, amount)| {
                ledger.with_balance(who, *amount)
            })
    }

    /// Schedule the next command no earlier than `height`. Used when the
    /// engine has already moved past the generator, as on a reopened ledger.
    pub fn resume_at(&mut self, height: Height) {
        self.height = self.height.max(height);
    }

    pub fn generate(&mut self, steps: usize) -> Vec<ScheduledCommand> {
        (0..steps).map(|_| self.next_command()).collect()
    }

    pub fn next_command(&mut self) -> ScheduledCommand {
        self.height += self.heights.below(MAX_HEIGHT_STEP + 1);
        let (caller, command) = self.pick_command();
        ScheduledCommand { height: self.height, caller, command }
    }

    fn pick_command(&mut self) -> (Principal, LedgerCommand) {
        if self.profile_owners.is_empty() {
            return self.mint_profile();
        }
        match self.workload.below(100) {
            0..=13 => self.mint_profile(),
            14..=25 => self.create_ticket(),
            26..=35 => self.resolve_ticket(),
            36..=45 => self.apply_discount(),
            46..=49 => self.batch_apply(),
            50..=59 => self.log_complaint(),
            60..=66 => self.resolve_complaint(),
            67..=74 => self.update_level(),
            75..=82 => self.distribute_reward(),
            83..=85 => self.transfer_profile(),
            86..=90 => self.create_proposal(),
            91..=96 => self.vote(),
            _ => self.tune_config(),
        }
    }

    fn any_customer(&mut self) -> Principal {
        self.workload
            .pick(&self.customers)
            .cloned()
            .unwrap_or_else(|| self.business.clone())
    }

    /// A known profile id and its predicted owner.
    fn any_profile(&mut self) -> Option<(ProfileId, Principal)> {
        let len = self.profile_owners.len() as u64;
        if len == 0 {
            return None;
        }
        let index = self.workload.below(len) as usize;
        let owner = self.profile_owners.get(index)?.clone();
        Some((index as ProfileId + 1, owner))
    }

    fn any_ticket(&mut self) -> Option<(TicketId, ProfileId)> {
        self.workload.pick(&self.tickets).copied()
    }

    fn mint_profile(&mut self) -> (Principal, LedgerCommand) {
        let owner = self.any_customer();
        self.profile_owners.push(owner.clone());
        self.complaint_totals.push(0);
        (owner.clone(), LedgerCommand::MintProfile { owner })
    }

    fn create_ticket(&mut self) -> (Principal, LedgerCommand) {
        let Some((profile_id, owner)) = self.any_profile() else {
            return self.mint_profile();
        };
        let ticket_id = self.tickets.len() as TicketId + 1;
        self.tickets.push((ticket_id, profile_id));
        let cost = self.workload.between(50, 5_000);
        let description = format!("repair request #{ticket_id}");
        (owner, LedgerCommand::CreateTicket { profile_id, description, cost })
    }

    fn resolve_ticket(&mut self) -> (Principal, LedgerCommand) {
        let Some((ticket_id, _)) = self.any_ticket() else {
            return self.create_ticket();
        };
        let status = if self.workload.chance(0.8) {
            TicketStatus::Resolved
        } else if self.workload.chance(0.5) {
            TicketStatus::Rejected
        } else {
            TicketStatus::InProgress
        };
        (self.business.clone(), LedgerCommand::ResolveTicket { ticket_id, status })
    }

    fn apply_discount(&mut self) -> (Principal, LedgerCommand) {
        let Some((ticket_id, _)) = self.any_ticket() else {
            return self.create_ticket();
        };
        (self.business.clone(), LedgerCommand::ApplyDiscount { ticket_id })
    }

    fn batch_apply(&mut self) -> (Principal, LedgerCommand) {
        if self.tickets.is_empty() {
            return self.create_ticket();
        }
        // Occasionally oversized, to exercise the batch limit.
        let len = if self.workload.chance(0.05) { 11 } else { self.workload.between(1, 4) };
        let ticket_ids = (0..len)
            .filter_map(|_| self.any_ticket().map(|(ticket_id, _)| ticket_id))
            .collect();
        (self.business.clone(), LedgerCommand::BatchApplyDiscounts { ticket_ids })
    }

    fn log_complaint(&mut self) -> (Principal, LedgerCommand) {
        let Some((profile_id, owner)) = self.any_profile() else {
            return self.mint_profile();
        };
        let caller = if self.workload.chance(0.9) { owner.clone() } else { self.any_customer() };
        if caller == owner {
            if let Some(total) = self.complaint_totals.get_mut(profile_id as usize - 1) {
                *total += 1;
                self.open_complaints.push((profile_id, *total));
            }
        }
        let description = format!("complaint from {caller}");
        (caller, LedgerCommand::LogComplaint { profile_id, description })
    }

    fn resolve_complaint(&mut self) -> (Principal, LedgerCommand) {
        if self.open_complaints.is_empty() {
            return self.log_complaint();
        }
        let index = self.workload.below(self.open_complaints.len() as u64) as usize;
        let (profile_id, complaint_id) = self.open_complaints.swap_remove(index);
        (self.business.clone(), LedgerCommand::ResolveComplaint { profile_id, complaint_id })
    }

    fn update_level(&mut self) -> (Principal, LedgerCommand) {
        let Some((profile_id, owner)) = self.any_profile() else {
            return self.mint_profile();
        };
        let level = self.workload.between(1, 6);
        (owner, LedgerCommand::UpdateLoyaltyLevel { profile_id, level })
    }

    fn distribute_reward(&mut self) -> (Principal, LedgerCommand) {
        let Some((ticket_id, profile_id)) = self.any_ticket() else {
            return self.create_ticket();
        };
        (self.business.clone(), LedgerCommand::DistributeReward { profile_id, ticket_id })
    }

    fn transfer_profile(&mut self) -> (Principal, LedgerCommand) {
        let Some((profile_id, owner)) = self.any_profile() else {
            return self.mint_profile();
        };
        let recipient = self.any_customer();
        if let Some(slot) = self.profile_owners.get_mut(profile_id as usize - 1) {
            *slot = recipient.clone();
        }
        (owner, LedgerCommand::TransferProfile { profile_id, recipient })
    }

    fn create_proposal(&mut self) -> (Principal, LedgerCommand) {
        let caller = self.any_customer();
        let duration = self.workload.between(10, 200);
        self.proposals_opened += 1;
        let description = format!("proposal {} from {caller}", self.proposals_opened);
        (caller, LedgerCommand::CreateProposal { description, duration })
    }

    fn vote(&mut self) -> (Principal, LedgerCommand) {
        if self.proposals_opened == 0 {
            return self.create_proposal();
        }
        let caller = self.any_customer();
        let proposal_id = self.workload.between(1, self.proposals_opened);
        let vote_yes = self.workload.chance(0.6);
        (caller, LedgerCommand::Vote { proposal_id, vote_yes })
    }

    fn tune_config(&mut self) -> (Principal, LedgerCommand) {
        let caller = if self.workload.chance(0.8) {
            self.business.clone()
        } else {
            self.any_customer()
        };
        let command = match self.workload.below(4) {
            0 => LedgerCommand::SetMaxDiscount { value: self.workload.between(10, 30) },
            1 => LedgerCommand::SetComplaintThreshold { value: self.workload.between(3, 8) },
            2 => LedgerCommand::SetDecayPeriod { value: self.workload.between(50, 200) },
            _ => LedgerCommand::SetDecayFactor { value: self.workload.between(50, 100) },
        };
        (caller, command)
    }
}

/// Tally of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub accepted:     u64,
    pub rejected:     u64,
    pub final_height: Height,
}

/// Run scheduled commands in order, advancing the engine to each one's
/// height first. Rejected commands are counted, not propagated. A command
/// scheduled below the engine's height fails with `HeightRegression` and
/// aborts the replay, as does a storage failure.
pub fn replay(engine: &mut LedgerEngine, commands: &[ScheduledCommand]) -> LedgerResult<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    for scheduled in commands {
        engine.advance_to(scheduled.height)?;
        match engine.execute(&scheduled.caller, scheduled.command.clone()) {
            Ok(_) => summary.accepted += 1,
            Err(err) if err.is_rejection() => summary.rejected += 1,
            Err(err) => return Err(err),
        }
    }
    summary.final_height = engine.height();
    log::info!(
        "replay: {} accepted, {} rejected, final height {}",
        summary.accepted,
        summary.rejected,
        summary.final_height,
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::LedgerError, store::LedgerStore};

    #[test]
    fn same_seed_same_commands() {
        let config = LedgerConfig::default_test();
        let a = ScenarioGenerator::new(99, &config).generate(200);
        let b = ScenarioGenerator::new(99, &config).generate(200);
        assert_eq!(a, b);

        let c = ScenarioGenerator::new(100, &config).generate(200);
        assert_ne!(a, c);
    }

    #[test]
    fn heights_never_decrease_and_first_command_mints() {
        let config = LedgerConfig::default_test();
        let commands = ScenarioGenerator::new(3, &config).generate(300);
        assert!(matches!(commands[0].command, LedgerCommand::MintProfile { .. }));
        assert!(commands.windows(2).all(|w| w[0].height <= w[1].height));
    }

    #[test]
    fn replay_mostly_accepts() {
        let config = LedgerConfig::default_test();
        let mut generator = ScenarioGenerator::new(7, &config);
        let commands = generator.generate(300);
        let store = LedgerStore::in_memory().unwrap();
        let mut engine = LedgerEngine::with_collaborators(
            config,
            store,
            Box::new(generator.token_ledger()),
            Box::new(crate::external::InMemoryIdentityRegistry::new("profile")),
            Box::new(crate::external::InMemoryIdentityRegistry::new("ticket")),
        )
        .unwrap();

        let summary = replay(&mut engine, &commands).unwrap();
        assert_eq!(summary.accepted + summary.rejected, 300);
        assert!(summary.accepted > summary.rejected, "{summary:?}");
        assert_eq!(summary.final_height, commands[299].height);
    }

    fn seeded_engine(generator: &ScenarioGenerator) -> LedgerEngine {
        LedgerEngine::with_collaborators(
            LedgerConfig::default_test(),
            LedgerStore::in_memory().unwrap(),
            Box::new(generator.token_ledger()),
            Box::new(crate::external::InMemoryIdentityRegistry::new("profile")),
            Box::new(crate::external::InMemoryIdentityRegistry::new("ticket")),
        )
        .unwrap()
    }

    #[test]
    fn replay_refuses_commands_below_the_engine_height() {
        let config = LedgerConfig::default_test();
        let mut generator = ScenarioGenerator::new(11, &config);
        let commands = generator.generate(20);
        let mut engine = seeded_engine(&generator);
        let past_schedule = commands[19].height + 1;
        engine.advance_to(past_schedule).unwrap();

        let err = replay(&mut engine, &commands).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::HeightRegression { current, .. } if current == past_schedule
        ));
        assert_eq!(engine.store().event_count().unwrap(), 0);
    }

    #[test]
    fn resumed_generator_replays_past_the_engine_height() {
        let config = LedgerConfig::default_test();
        let mut generator = ScenarioGenerator::new(11, &config);
        let mut engine = seeded_engine(&generator);
        engine.advance_to(5_000).unwrap();

        generator.resume_at(engine.height());
        let commands = generator.generate(50);
        assert!(commands.iter().all(|c| c.height >= 5_000));
        let summary = replay(&mut engine, &commands).unwrap();
        assert_eq!(summary.accepted + summary.rejected, 50);
        assert_eq!(summary.final_height, commands[49].height);

        // Never moves the generator backwards.
        generator.resume_at(10);
        assert!(generator.next_command().height >= commands[49].height);
    }
}
