//! The ledger engine: owns state and hands out component handles.
//!
//! RULES:
//!   - Every operation is one atomic transaction against the store.
//!   - The height is fixed for the life of a component handle; only the
//!     engine moves it, and only between transactions.
//!   - Components never hold each other. Cross-component reads go through
//!     the store or the `LoyaltyView` capability.
//!   - Every committed mutation is recorded in the event log.

use crate::{
    clock::LedgerClock,
    command::{CommandOutcome, LedgerCommand},
    complaint_registry::ComplaintRegistry,
    config::LedgerConfig,
    discount_engine::DiscountEngine,
    error::LedgerResult,
    external::{IdentityRegistry, InMemoryIdentityRegistry, InMemoryTokenLedger, TokenLedger},
    governance::GovernanceVoting,
    profile_registry::ProfileRegistry,
    reward_distributor::RewardDistributor,
    store::LedgerStore,
    ticket_ledger::TicketLedger,
    types::{Height, Principal},
};

pub struct LedgerEngine {
    pub clock:   LedgerClock,
    config:      LedgerConfig,
    store:       LedgerStore,
    tokens:      Box<dyn TokenLedger>,
    profile_ids: Box<dyn IdentityRegistry>,
    ticket_ids:  Box<dyn IdentityRegistry>,
}

impl LedgerEngine {
    /// Build an engine with in-memory token and identity collaborators.
    pub fn build(config: LedgerConfig, store: LedgerStore) -> LedgerResult<Self> {
        Self::with_collaborators(
            config,
            store,
            Box::new(InMemoryTokenLedger::new()),
            Box::new(InMemoryIdentityRegistry::new("profile")),
            Box::new(InMemoryIdentityRegistry::new("ticket")),
        )
    }

    /// Validate the config, migrate, seed genesis parameters on first use,
    /// restore identity ownership from stored rows and resume at the
    /// persisted height.
    pub fn with_collaborators(
        config: LedgerConfig,
        store: LedgerStore,
        tokens: Box<dyn TokenLedger>,
        mut profile_ids: Box<dyn IdentityRegistry>,
        mut ticket_ids: Box<dyn IdentityRegistry>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        store.migrate()?;
        if !store.has_params()? {
            store.save_params(&config.genesis_params())?;
            log::info!("genesis: ledger owned by {}", config.owner);
        }
        let restored = restore_identities(profile_ids.as_mut(), store.profile_owners()?)?;
        if restored > 0 {
            log::info!("restored {restored} profile identities");
        }
        let restored = restore_identities(ticket_ids.as_mut(), store.ticket_owners()?)?;
        if restored > 0 {
            log::info!("restored {restored} ticket identities");
        }
        let clock = LedgerClock::at(store.load_height()?);
        log::info!("engine ready at height {}", clock.current_height);
        Ok(Self {
            clock,
            config,
            store,
            tokens,
            profile_ids,
            ticket_ids,
        })
    }

    pub fn height(&self) -> Height {
        self.clock.current_height
    }

    pub fn advance_to(&mut self, height: Height) -> LedgerResult<Height> {
        let mut clock = self.clock;
        clock.advance_to(height)?;
        self.store.save_height(clock.current_height)?;
        self.clock = clock;
        Ok(self.clock.current_height)
    }

    pub fn advance_by(&mut self, delta: Height) -> LedgerResult<Height> {
        let mut clock = self.clock;
        let target = clock.advance_by(delta)?;
        self.advance_to(target)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn token_ledger(&self) -> &dyn TokenLedger {
        self.tokens.as_ref()
    }

    pub fn profile_identities(&self) -> &dyn IdentityRegistry {
        self.profile_ids.as_ref()
    }

    pub fn ticket_identities(&self) -> &dyn IdentityRegistry {
        self.ticket_ids.as_ref()
    }

    // ── Component handles ──────────────────────────────────────

    pub fn profiles(&mut self) -> ProfileRegistry<'_> {
        ProfileRegistry::new(&self.store, &mut *self.profile_ids, self.clock.current_height)
    }

    pub fn complaints(&self) -> ComplaintRegistry<'_> {
        ComplaintRegistry::new(&self.store, self.clock.current_height)
    }

    pub fn tickets(&mut self) -> TicketLedger<'_> {
        TicketLedger::new(&self.store, &mut *self.ticket_ids, self.clock.current_height)
    }

    pub fn discounts(&self) -> DiscountEngine<'_> {
        DiscountEngine::new(&self.store, &self.store, self.clock.current_height)
    }

    pub fn rewards(&mut self) -> RewardDistributor<'_> {
        RewardDistributor::new(
            &self.store,
            &mut *self.tokens,
            self.config.reward_per_repair,
            self.clock.current_height,
        )
    }

    pub fn governance(&self) -> GovernanceVoting<'_> {
        GovernanceVoting::new(
            &self.store,
            &*self.tokens,
            self.config.min_stake,
            self.clock.current_height,
        )
    }

    // ── Command dispatch ───────────────────────────────────────

    /// Run one command as `caller` at the current height.
    pub fn execute(
        &mut self,
        caller: &Principal,
        command: LedgerCommand,
    ) -> LedgerResult<CommandOutcome> {
        let name = command.name();
        let result = self.dispatch(caller, command);
        if let Err(err) = &result {
            log::warn!("height={} {name} by {caller} rejected: {err}", self.height());
        }
        result
    }

    fn dispatch(&mut self, caller: &Principal, command: LedgerCommand) -> LedgerResult<CommandOutcome> {
        use CommandOutcome::Done;
        let outcome = match command {
            LedgerCommand::MintProfile { owner } => CommandOutcome::ProfileMinted {
                profile_id: self.profiles().mint_profile(caller, &owner)?,
            },
            LedgerCommand::TransferProfile { profile_id, recipient } => {
                self.profiles().transfer_profile(caller, profile_id, &recipient)?;
                Done
            }
            LedgerCommand::UpdateLoyaltyLevel { profile_id, level } => {
                self.profiles().update_loyalty_level(caller, profile_id, level)?;
                Done
            }
            LedgerCommand::LogComplaint { profile_id, description } => {
                CommandOutcome::ComplaintLogged {
                    complaint_id: self.complaints().log_complaint(caller, profile_id, &description)?,
                }
            }
            LedgerCommand::ResolveComplaint { profile_id, complaint_id } => {
                self.complaints().resolve_complaint(caller, profile_id, complaint_id)?;
                Done
            }
            LedgerCommand::CreateTicket { profile_id, description, cost } => {
                CommandOutcome::TicketCreated {
                    ticket_id: self.tickets().create_ticket(caller, profile_id, &description, cost)?,
                }
            }
            LedgerCommand::ResolveTicket { ticket_id, status } => {
                self.tickets().resolve_ticket(caller, ticket_id, status)?;
                Done
            }
            LedgerCommand::ApplyDiscount { ticket_id } => CommandOutcome::DiscountApplied {
                discounted_cost: self.discounts().apply_discount_to_ticket(caller, ticket_id)?,
            },
            LedgerCommand::BatchApplyDiscounts { ticket_ids } => CommandOutcome::BatchApplied {
                total_discount: self.discounts().batch_apply_discounts(caller, &ticket_ids)?,
            },
            LedgerCommand::SetMaxDiscount { value } => {
                self.discounts().set_max_discount(caller, value)?;
                Done
            }
            LedgerCommand::SetComplaintThreshold { value } => {
                self.discounts().set_complaint_threshold(caller, value)?;
                Done
            }
            LedgerCommand::SetDecayPeriod { value } => {
                self.discounts().set_decay_period(caller, value)?;
                Done
            }
            LedgerCommand::SetDecayFactor { value } => {
                self.discounts().set_decay_factor(caller, value)?;
                Done
            }
            LedgerCommand::TransferOwnership { new_owner } => {
                self.discounts().transfer_ownership(caller, &new_owner)?;
                Done
            }
            LedgerCommand::DistributeReward { profile_id, ticket_id } => {
                CommandOutcome::RewardDistributed {
                    amount: self.rewards().distribute_reward(caller, profile_id, ticket_id)?,
                }
            }
            LedgerCommand::CreateProposal { description, duration } => {
                CommandOutcome::ProposalCreated {
                    proposal_id: self.governance().create_proposal(caller, &description, duration)?,
                }
            }
            LedgerCommand::Vote { proposal_id, vote_yes } => {
                self.governance().vote(caller, proposal_id, vote_yes)?;
                Done
            }
        };
        Ok(outcome)
    }
}

/// Mint every stored `(id, owner)` the registry does not already know.
fn restore_identities(
    registry: &mut dyn IdentityRegistry,
    owners: Vec<(u64, Principal)>,
) -> LedgerResult<usize> {
    let mut restored = 0;
    for (id, owner) in owners {
        if registry.owner_of(id).is_none() {
            registry.mint(id, &owner)?;
            restored += 1;
        }
    }
    Ok(restored)
}
