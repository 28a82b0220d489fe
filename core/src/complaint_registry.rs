//! Complaint registry: the append-mostly complaint log and the
//! per-profile counters the decay model reads.
//!
//! A complaint is immutable once logged except for its `resolved` flag,
//! which flips false → true exactly once.

use crate::{
    error::{LedgerError, LedgerResult},
    event::LedgerEvent,
    store::{require, LedgerStore},
    types::{ComplaintId, Height, Principal, ProfileId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplaintCounters {
    pub total_complaints:      u64,
    pub unresolved_complaints: u64,
    pub last_complaint_height: Height,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplaintRecord {
    pub profile_id:   ProfileId,
    pub complaint_id: ComplaintId,
    pub timestamp:    Height,
    pub description:  String,
    pub resolved:     bool,
}

pub struct ComplaintRegistry<'a> {
    store:  &'a LedgerStore,
    height: Height,
}

impl<'a> ComplaintRegistry<'a> {
    pub fn new(store: &'a LedgerStore, height: Height) -> Self {
        Self { store, height }
    }

    /// Log a complaint against a profile the caller owns.
    pub fn log_complaint(
        &self,
        caller: &Principal,
        profile_id: ProfileId,
        description: &str,
    ) -> LedgerResult<ComplaintId> {
        let height = self.height;
        let complaint_id = self.store.atomic(|store| {
            let profile = require(store.get_profile(profile_id)?, "profile", profile_id)?;
            if &profile.owner != caller {
                return Err(LedgerError::NotProfileOwner { caller: caller.clone(), profile_id });
            }

            let mut counters = store.get_complaint_counters(profile_id)?.unwrap_or_default();
            let complaint_id = counters
                .total_complaints
                .checked_add(1)
                .ok_or(LedgerError::ArithmeticOverflow { context: "complaint id" })?;
            counters.total_complaints = complaint_id;
            counters.unresolved_complaints += 1;
            counters.last_complaint_height = height;

            store.insert_complaint(&ComplaintRecord {
                profile_id,
                complaint_id,
                timestamp: height,
                description: description.to_string(),
                resolved: false,
            })?;
            store.upsert_complaint_counters(profile_id, &counters)?;
            store.append_event(height, &LedgerEvent::ComplaintLogged { profile_id, complaint_id })?;
            Ok(complaint_id)
        })?;
        log::debug!("height={height} complaint: profile {profile_id} logged #{complaint_id}");
        Ok(complaint_id)
    }

    /// Mark an open complaint resolved. Business owner only.
    ///
    /// An already-resolved complaint is treated as absent: there is no open
    /// complaint with that id, and the unresolved counter must not drop twice.
    pub fn resolve_complaint(
        &self,
        caller: &Principal,
        profile_id: ProfileId,
        complaint_id: ComplaintId,
    ) -> LedgerResult<()> {
        let height = self.height;
        self.store.atomic(|store| {
            store.get_params()?.ensure_owner(caller, "resolve complaint")?;

            let complaint = require(
                store.get_complaint(profile_id, complaint_id)?,
                "complaint",
                complaint_id,
            )?;
            if complaint.resolved {
                return Err(LedgerError::InvalidId { entity: "open complaint", id: complaint_id });
            }
            let mut counters = require(
                store.get_complaint_counters(profile_id)?,
                "complaint counters",
                profile_id,
            )?;
            counters.unresolved_complaints = counters
                .unresolved_complaints
                .checked_sub(1)
                .ok_or(LedgerError::ArithmeticOverflow { context: "unresolved complaints" })?;

            store.mark_complaint_resolved(profile_id, complaint_id)?;
            store.upsert_complaint_counters(profile_id, &counters)?;
            store.append_event(height, &LedgerEvent::ComplaintResolved { profile_id, complaint_id })
        })?;
        log::debug!("height={height} complaint: profile {profile_id} resolved #{complaint_id}");
        Ok(())
    }

    pub fn get_complaint(
        &self,
        profile_id: ProfileId,
        complaint_id: ComplaintId,
    ) -> LedgerResult<ComplaintRecord> {
        require(
            self.store.get_complaint(profile_id, complaint_id)?,
            "complaint",
            complaint_id,
        )
    }

    pub fn complaints_for_profile(&self, profile_id: ProfileId) -> LedgerResult<Vec<ComplaintRecord>> {
        self.store.complaints_for_profile(profile_id)
    }

    /// Zeroed counters for a profile that never complained.
    pub fn counters(&self, profile_id: ProfileId) -> LedgerResult<ComplaintCounters> {
        Ok(self.store.get_complaint_counters(profile_id)?.unwrap_or_default())
    }

    pub fn get_complaint_count(&self, profile_id: ProfileId) -> LedgerResult<u64> {
        Ok(self.counters(profile_id)?.total_complaints)
    }

    pub fn get_unresolved_count(&self, profile_id: ProfileId) -> LedgerResult<u64> {
        Ok(self.counters(profile_id)?.unresolved_complaints)
    }
}
