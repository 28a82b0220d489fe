//! Read-only capability the discount engine computes against.
//!
//! The engine never reaches into the profile or complaint stores directly;
//! it asks a `LoyaltyView`. The SQLite store is the production view.

use crate::{
    complaint_registry::ComplaintCounters,
    config::DiscountParams,
    error::LedgerResult,
    store::LedgerStore,
    types::ProfileId,
};

pub trait LoyaltyView {
    /// `None` for an unknown profile.
    fn loyalty_level(&self, profile_id: ProfileId) -> LedgerResult<Option<u64>>;

    /// Zeroed counters for a profile with no complaints.
    fn complaint_counters(&self, profile_id: ProfileId) -> LedgerResult<ComplaintCounters>;

    fn discount_params(&self) -> LedgerResult<DiscountParams>;
}

impl LoyaltyView for LedgerStore {
    fn loyalty_level(&self, profile_id: ProfileId) -> LedgerResult<Option<u64>> {
        Ok(self.get_profile(profile_id)?.map(|p| p.loyalty_level))
    }

    fn complaint_counters(&self, profile_id: ProfileId) -> LedgerResult<ComplaintCounters> {
        Ok(self.get_complaint_counters(profile_id)?.unwrap_or_default())
    }

    fn discount_params(&self) -> LedgerResult<DiscountParams> {
        self.get_params()
    }
}
