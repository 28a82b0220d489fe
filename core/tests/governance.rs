//! Stake-gated proposals and votes.

use loyalty_core::{
    config::LedgerConfig,
    engine::LedgerEngine,
    error::LedgerError,
    external::{InMemoryIdentityRegistry, InMemoryTokenLedger},
    governance::ProposalStatus,
    store::LedgerStore,
    types::Principal,
};

/// min_stake is 100: alice has exactly enough, bob plenty, carol none.
fn staked_engine() -> LedgerEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let tokens = InMemoryTokenLedger::new()
        .with_balance("alice", 100)
        .with_balance("bob", 500);
    LedgerEngine::with_collaborators(
        LedgerConfig::default_test(),
        LedgerStore::in_memory().expect("in-memory store"),
        Box::new(tokens),
        Box::new(InMemoryIdentityRegistry::new("profile")),
        Box::new(InMemoryIdentityRegistry::new("ticket")),
    )
    .expect("engine")
}

fn who(name: &str) -> Principal {
    name.to_string()
}

#[test]
fn proposals_need_stake() {
    let engine = staked_engine();
    let id = engine.governance().create_proposal(&who("alice"), "raise max discount", 10).unwrap();
    assert_eq!(id, 1);
    assert!(matches!(
        engine.governance().create_proposal(&who("carol"), "free repairs", 10),
        Err(LedgerError::NotAuthorized { .. })
    ));
    assert_eq!(engine.governance().proposal_count().unwrap(), 1);

    let proposal = engine.governance().get_proposal(id).unwrap();
    assert_eq!(proposal.proposer, "alice");
    assert_eq!(proposal.end_height, 10);
    assert_eq!((proposal.yes_votes, proposal.no_votes), (0, 0));
}

#[test]
fn one_vote_per_voter() {
    let engine = staked_engine();
    let bob = who("bob");
    let id = engine.governance().create_proposal(&who("alice"), "shorter decay", 10).unwrap();

    engine.governance().vote(&bob, id, true).unwrap();
    assert!(engine.governance().has_voted(id, &bob).unwrap());
    assert!(matches!(
        engine.governance().vote(&bob, id, false),
        Err(LedgerError::AlreadyVoted { .. })
    ));
    assert!(matches!(
        engine.governance().vote(&who("carol"), id, true),
        Err(LedgerError::NotAuthorized { .. })
    ));
    assert!(matches!(
        engine.governance().vote(&bob, 9, true),
        Err(LedgerError::InvalidId { .. })
    ));

    let proposal = engine.governance().get_proposal(id).unwrap();
    assert_eq!((proposal.yes_votes, proposal.no_votes), (1, 0));
    assert!(!engine.governance().has_voted(id, &who("carol")).unwrap());
}

#[test]
fn voting_closes_at_end_height() {
    let mut engine = staked_engine();
    let alice = who("alice");
    let bob = who("bob");
    let id = engine.governance().create_proposal(&alice, "longer warranty", 10).unwrap();

    engine.advance_to(9).unwrap();
    engine.governance().vote(&bob, id, true).unwrap();
    assert_eq!(engine.governance().proposal_status(id).unwrap(), ProposalStatus::Open);

    engine.advance_to(10).unwrap();
    assert!(matches!(
        engine.governance().vote(&alice, id, false),
        Err(LedgerError::ProposalEnded { end_height: 10, .. })
    ));
    assert_eq!(engine.governance().proposal_status(id).unwrap(), ProposalStatus::Passed);
}

#[test]
fn ties_are_rejected() {
    let mut engine = staked_engine();
    let id = engine.governance().create_proposal(&who("alice"), "new tier", 5).unwrap();
    engine.governance().vote(&who("alice"), id, true).unwrap();
    engine.governance().vote(&who("bob"), id, false).unwrap();
    engine.advance_by(5).unwrap();
    assert_eq!(engine.governance().proposal_status(id).unwrap(), ProposalStatus::Rejected);
}
