//! External collaborators: the fungible token ledger and the
//! non-fungible identity registry.
//!
//! The ledger never owns token or identity plumbing. It is handed an
//! implementation of these traits at construction. The in-memory
//! versions below back tests and the headless runner.

use crate::{
    error::{LedgerError, LedgerResult},
    types::{Amount, Principal},
};
use std::collections::HashMap;

/// Opaque fungible-token primitive.
pub trait TokenLedger: Send {
    fn mint(&mut self, amount: Amount, recipient: &Principal) -> LedgerResult<()>;
    fn balance_of(&self, principal: &Principal) -> Amount;
}

/// Opaque non-fungible ownership primitive, one instance per collection.
pub trait IdentityRegistry: Send {
    fn mint(&mut self, id: u64, owner: &Principal) -> LedgerResult<()>;
    fn transfer_owner(&mut self, id: u64, from: &Principal, to: &Principal) -> LedgerResult<()>;
    fn owner_of(&self, id: u64) -> Option<Principal>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryTokenLedger {
    balances: HashMap<Principal, Amount>,
    supply:   Amount,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an opening balance. Used to give governance participants stake.
    pub fn with_balance(mut self, principal: &str, amount: Amount) -> Self {
        self.balances.insert(principal.to_string(), amount);
        self.supply = self.supply.saturating_add(amount);
        self
    }

    pub fn total_supply(&self) -> Amount {
        self.supply
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn mint(&mut self, amount: Amount, recipient: &Principal) -> LedgerResult<()> {
        let overflow = LedgerError::ArithmeticOverflow { context: "token mint" };
        let supply = self.supply.checked_add(amount).ok_or(overflow)?;
        let current = self.balances.get(recipient).copied().unwrap_or(0);
        let balance = current
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow { context: "token mint" })?;
        self.balances.insert(recipient.clone(), balance);
        self.supply = supply;
        Ok(())
    }

    fn balance_of(&self, principal: &Principal) -> Amount {
        self.balances.get(principal).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryIdentityRegistry {
    collection: &'static str,
    owners:     HashMap<u64, Principal>,
}

impl InMemoryIdentityRegistry {
    pub fn new(collection: &'static str) -> Self {
        Self { collection, owners: HashMap::new() }
    }
}

impl IdentityRegistry for InMemoryIdentityRegistry {
    fn mint(&mut self, id: u64, owner: &Principal) -> LedgerResult<()> {
        if self.owners.contains_key(&id) {
            return Err(LedgerError::InvalidParam {
                field: self.collection,
                value: format!("{id} already minted"),
            });
        }
        self.owners.insert(id, owner.clone());
        Ok(())
    }

    fn transfer_owner(&mut self, id: u64, from: &Principal, to: &Principal) -> LedgerResult<()> {
        match self.owners.get_mut(&id) {
            None => Err(LedgerError::InvalidId { entity: self.collection, id }),
            Some(owner) if owner != from => Err(LedgerError::NotAuthorized {
                caller: from.clone(),
                action: "identity transfer",
            }),
            Some(owner) => {
                *owner = to.clone();
                Ok(())
            }
        }
    }

    fn owner_of(&self, id: u64) -> Option<Principal> {
        self.owners.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_accumulates_balance_and_supply() {
        let mut tokens = InMemoryTokenLedger::new().with_balance("alice", 40);
        tokens.mint(10, &"alice".to_string()).unwrap();
        tokens.mint(5, &"bob".to_string()).unwrap();

        assert_eq!(tokens.balance_of(&"alice".to_string()), 50);
        assert_eq!(tokens.balance_of(&"bob".to_string()), 5);
        assert_eq!(tokens.balance_of(&"carol".to_string()), 0);
        assert_eq!(tokens.total_supply(), 55);
    }

    #[test]
    fn mint_overflow_leaves_balances_untouched() {
        let mut tokens = InMemoryTokenLedger::new().with_balance("alice", u64::MAX);
        assert!(tokens.mint(1, &"bob".to_string()).is_err());
        assert_eq!(tokens.balance_of(&"bob".to_string()), 0);
    }

    #[test]
    fn identity_transfer_requires_current_owner() {
        let mut ids = InMemoryIdentityRegistry::new("profile");
        let alice = "alice".to_string();
        let bob = "bob".to_string();
        ids.mint(1, &alice).unwrap();
        assert!(ids.mint(1, &bob).is_err(), "ids are minted once");

        assert!(ids.transfer_owner(1, &bob, &bob).is_err());
        ids.transfer_owner(1, &alice, &bob).unwrap();
        assert_eq!(ids.owner_of(1), Some(bob));
        assert!(matches!(
            ids.transfer_owner(9, &alice, &alice),
            Err(LedgerError::InvalidId { id: 9, .. })
        ));
    }
}
