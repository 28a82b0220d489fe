//! Profile registry: owns profile identity and loyalty level.
//!
//! Profiles are minted once and never deleted. The owner recorded here
//! is mirrored into the external identity registry on mint and transfer.

use crate::{
    error::{LedgerError, LedgerResult},
    event::LedgerEvent,
    external::IdentityRegistry,
    store::{require, LedgerStore},
    types::{Height, Principal, ProfileId},
};
use serde::{Deserialize, Serialize};

pub const PROFILE_COUNTER: &str = "profile";
pub const STARTING_LEVEL: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRecord {
    pub profile_id:    ProfileId,
    pub owner:         Principal,
    pub join_height:   Height,
    pub loyalty_level: u64,
}

pub struct ProfileRegistry<'a> {
    store:      &'a LedgerStore,
    identities: &'a mut dyn IdentityRegistry,
    height:     Height,
}

impl<'a> ProfileRegistry<'a> {
    pub fn new(
        store: &'a LedgerStore,
        identities: &'a mut dyn IdentityRegistry,
        height: Height,
    ) -> Self {
        Self { store, identities, height }
    }

    /// Mint a profile for `owner`. Anyone may mint for anyone.
    pub fn mint_profile(&mut self, caller: &Principal, owner: &Principal) -> LedgerResult<ProfileId> {
        let height = self.height;
        let identities = &mut *self.identities;
        let profile_id = self.store.atomic(|store| {
            let profile_id = store.next_id(PROFILE_COUNTER)?;
            store.insert_profile(&ProfileRecord {
                profile_id,
                owner: owner.clone(),
                join_height: height,
                loyalty_level: STARTING_LEVEL,
            })?;
            store.append_event(
                height,
                &LedgerEvent::ProfileMinted { profile_id, owner: owner.clone() },
            )?;
            identities.mint(profile_id, owner)?;
            Ok(profile_id)
        })?;
        log::debug!("height={height} profile: {caller} minted profile {profile_id} for {owner}");
        Ok(profile_id)
    }

    /// Hand the profile to `recipient`. The caller is the sender and must
    /// be the current owner. Join height and level carry over.
    pub fn transfer_profile(
        &mut self,
        caller: &Principal,
        profile_id: ProfileId,
        recipient: &Principal,
    ) -> LedgerResult<()> {
        let height = self.height;
        let identities = &mut *self.identities;
        self.store.atomic(|store| {
            let profile = require(store.get_profile(profile_id)?, "profile", profile_id)?;
            if &profile.owner != caller {
                return Err(LedgerError::NotOwner { caller: caller.clone(), profile_id });
            }
            store.set_profile_owner(profile_id, recipient)?;
            store.append_event(
                height,
                &LedgerEvent::ProfileTransferred {
                    profile_id,
                    from: caller.clone(),
                    to:   recipient.clone(),
                },
            )?;
            identities.transfer_owner(profile_id, caller, recipient)
        })?;
        log::debug!("height={height} profile: {profile_id} transferred {caller} -> {recipient}");
        Ok(())
    }

    /// Set the loyalty level of a profile the caller owns.
    ///
    /// No bound is enforced and the level is not tied to repair history,
    /// so an owner can raise their own discount tier.
    pub fn update_loyalty_level(
        &self,
        caller: &Principal,
        profile_id: ProfileId,
        level: u64,
    ) -> LedgerResult<()> {
        let height = self.height;
        self.store.atomic(|store| {
            let profile = require(store.get_profile(profile_id)?, "profile", profile_id)?;
            if &profile.owner != caller {
                return Err(LedgerError::NotOwner { caller: caller.clone(), profile_id });
            }
            store.set_loyalty_level(profile_id, level)?;
            store.append_event(height, &LedgerEvent::LoyaltyLevelUpdated { profile_id, level })
        })?;
        log::debug!("height={height} profile: {profile_id} loyalty level -> {level}");
        Ok(())
    }

    pub fn get_owner(&self, profile_id: ProfileId) -> LedgerResult<Principal> {
        Ok(self.get_profile(profile_id)?.owner)
    }

    pub fn get_profile(&self, profile_id: ProfileId) -> LedgerResult<ProfileRecord> {
        require(self.store.get_profile(profile_id)?, "profile", profile_id)
    }

    pub fn profile_count(&self) -> LedgerResult<i64> {
        self.store.profile_count()
    }
}
