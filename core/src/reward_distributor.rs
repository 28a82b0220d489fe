//! Reward distributor: pays tokens for resolved repairs.
//!
//! The n-th reward a profile receives pays `n * reward_per_repair`, so each
//! reward is larger than the one before it. The mint goes to whoever owns
//! the profile at payout time.

use crate::{
    error::{LedgerError, LedgerResult},
    event::LedgerEvent,
    external::TokenLedger,
    store::{require, LedgerStore},
    ticket_ledger::TicketStatus,
    types::{Amount, Height, Principal, ProfileId, TicketId},
};

/// The repair count after one more reward, and what that reward pays.
fn next_reward(repair_count: u64, per_repair: Amount) -> LedgerResult<(u64, Amount)> {
    let overflow = || LedgerError::ArithmeticOverflow { context: "repair reward" };
    let count = repair_count.checked_add(1).ok_or_else(overflow)?;
    let amount = count.checked_mul(per_repair).ok_or_else(overflow)?;
    Ok((count, amount))
}

pub struct RewardDistributor<'a> {
    store:             &'a LedgerStore,
    tokens:            &'a mut dyn TokenLedger,
    reward_per_repair: Amount,
    height:            Height,
}

impl<'a> RewardDistributor<'a> {
    pub fn new(
        store: &'a LedgerStore,
        tokens: &'a mut dyn TokenLedger,
        reward_per_repair: Amount,
        height: Height,
    ) -> Self {
        Self { store, tokens, reward_per_repair, height }
    }

    /// The amount the next reward for this profile would pay.
    pub fn reward_for(&self, profile_id: ProfileId) -> LedgerResult<Amount> {
        let count = self.store.repair_count(profile_id)?;
        Ok(next_reward(count, self.reward_per_repair)?.1)
    }

    /// Pay the reward for a resolved ticket on `profile_id`.
    ///
    /// Fails with `InvalidId` unless the ticket exists, is resolved, and
    /// belongs to the profile. The same ticket may be rewarded more than
    /// once; nothing records which tickets have paid out.
    pub fn distribute_reward(
        &mut self,
        caller: &Principal,
        profile_id: ProfileId,
        ticket_id: TicketId,
    ) -> LedgerResult<Amount> {
        let height = self.height;
        let per_repair = self.reward_per_repair;
        let tokens = &mut *self.tokens;
        let (recipient, amount) = self.store.atomic(|store| {
            let ticket = require(store.get_ticket(ticket_id)?, "ticket", ticket_id)?;
            if ticket.status != TicketStatus::Resolved || ticket.profile_id != profile_id {
                return Err(LedgerError::InvalidId { entity: "resolved ticket for profile", id: ticket_id });
            }
            let recipient = require(store.get_profile(profile_id)?, "profile", profile_id)?.owner;

            let (repair_count, amount) = next_reward(store.repair_count(profile_id)?, per_repair)?;

            store.set_repair_count(profile_id, repair_count)?;
            store.append_event(
                height,
                &LedgerEvent::RewardDistributed {
                    profile_id,
                    ticket_id,
                    recipient: recipient.clone(),
                    amount,
                    repair_count,
                },
            )?;
            tokens.mint(amount, &recipient)?;
            Ok((recipient, amount))
        })?;
        log::debug!(
            "height={height} reward: {caller} paid {amount} to {recipient} for ticket #{ticket_id}"
        );
        Ok(amount)
    }

    pub fn get_repair_count(&self, profile_id: ProfileId) -> LedgerResult<u64> {
        self.store.repair_count(profile_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewards_grow_linearly_with_repairs() {
        assert_eq!(next_reward(0, 10).unwrap(), (1, 10));
        assert_eq!(next_reward(1, 10).unwrap(), (2, 20));
        assert_eq!(next_reward(4, 7).unwrap(), (5, 35));
    }

    #[test]
    fn reward_overflow_is_an_error() {
        assert!(next_reward(u64::MAX, 1).is_err());
        assert!(next_reward(u64::MAX / 2, 3).is_err());
    }
}
