//! Discount engine: decay-weighted, tiered loyalty discounts.
//!
//! The engine reads profiles, complaint counters and parameters through a
//! [`LoyaltyView`] and writes only two things: a ticket's cost and the
//! discount history entry for that ticket.
//!
//! # Effective complaints
//!
//! ```text
//! periods   = floor((height - last_complaint_height) / decay_period)
//! decayed   = total_complaints * (decay_factor_pct / 100) ^ periods
//! effective = unresolved_complaints + floor(decayed)
//! ```
//!
//! Unresolved complaints never decay. Only the historical total fades, and
//! only while no new complaint is logged. `decayed` is computed in integer
//! fixed point (12 decimal places), one multiplication per elapsed period,
//! and floored once at the end.
//!
//! # Discount
//!
//! ```text
//! effective > complaint_threshold  =>  no discount
//! discount_pct = floor(level * max_discount_pct / 10)
//! tier_bonus   = 5 if level >= 5, 3 if level >= 3, else 0
//! cost         = base - floor(base * min(discount_pct + tier_bonus, 100) / 100)
//! ```
//!
//! The percentage is capped at 100, so the result is never negative and
//! never above `base`.

use crate::{
    complaint_registry::ComplaintCounters,
    config::{
        validate_complaint_threshold, validate_decay_factor, validate_decay_period,
        validate_max_discount, ConfigField, DiscountParams,
    },
    error::{LedgerError, LedgerResult},
    event::LedgerEvent,
    store::{require, LedgerStore},
    types::{Amount, Height, Principal, ProfileId, TicketId},
    view::LoyaltyView,
};
use serde::{Deserialize, Serialize};

/// Most tickets a single batch call may touch.
pub const MAX_BATCH_SIZE: usize = 10;

/// `level * max_discount_pct` is divided by this to get a percentage.
pub const LEVEL_PCT_DIVISOR: u128 = 10;

const DECAY_SCALE: u128 = 1_000_000_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountRecord {
    pub profile_id:       ProfileId,
    pub ticket_id:        TicketId,
    pub applied_discount: Amount,
    pub timestamp:        Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedDiscount {
    pub base_cost:       Amount,
    pub discounted_cost: Amount,
}

impl AppliedDiscount {
    pub fn discount(&self) -> Amount {
        self.base_cost - self.discounted_cost
    }
}

// ── Pure math ──────────────────────────────────────────────────────

/// `total * (factor/100)^periods`, floored.
pub fn decayed_total(total: u64, periods: u64, decay_factor_pct: u64) -> u64 {
    if total == 0 || periods == 0 || decay_factor_pct >= 100 {
        return total;
    }
    if decay_factor_pct == 0 {
        return 0;
    }
    let factor = decay_factor_pct as u128;
    let mut scaled = total as u128 * DECAY_SCALE;
    let mut remaining = periods;
    while remaining > 0 && scaled > 0 {
        scaled = scaled * factor / 100;
        remaining -= 1;
    }
    (scaled / DECAY_SCALE) as u64
}

pub fn effective_complaints(
    counters: &ComplaintCounters,
    height: Height,
    params: &DiscountParams,
) -> u64 {
    let elapsed = height.saturating_sub(counters.last_complaint_height);
    let periods = elapsed.checked_div(params.decay_period).unwrap_or(0);
    let decayed = decayed_total(counters.total_complaints, periods, params.decay_factor_pct);
    counters.unresolved_complaints.saturating_add(decayed)
}

pub fn tier_bonus(level: u64) -> u64 {
    match level {
        l if l >= 5 => 5,
        l if l >= 3 => 3,
        _ => 0,
    }
}

/// The discounted cost for a profile with the given standing.
pub fn discounted_cost(
    base_cost: Amount,
    effective: u64,
    level: u64,
    params: &DiscountParams,
) -> Amount {
    if effective > params.complaint_threshold {
        return base_cost;
    }
    let discount_pct = level as u128 * params.max_discount_pct as u128 / LEVEL_PCT_DIVISOR;
    let total_pct = (discount_pct + tier_bonus(level) as u128).min(100);
    let discount = base_cost as u128 * total_pct / 100;
    base_cost - discount as u64
}

// ── Engine ─────────────────────────────────────────────────────────

pub struct DiscountEngine<'a> {
    store:  &'a LedgerStore,
    view:   &'a dyn LoyaltyView,
    height: Height,
}

impl<'a> DiscountEngine<'a> {
    pub fn new(store: &'a LedgerStore, view: &'a dyn LoyaltyView, height: Height) -> Self {
        Self { store, view, height }
    }

    pub fn params(&self) -> LedgerResult<DiscountParams> {
        self.view.discount_params()
    }

    pub fn effective_complaints(&self, profile_id: ProfileId) -> LedgerResult<u64> {
        let params = self.view.discount_params()?;
        let counters = self.view.complaint_counters(profile_id)?;
        Ok(effective_complaints(&counters, self.height, &params))
    }

    /// Quote the discounted cost. Unknown profiles are level 0, which
    /// means no discount rather than an error.
    pub fn calculate_discount(&self, profile_id: ProfileId, base_cost: Amount) -> LedgerResult<Amount> {
        let params = self.view.discount_params()?;
        let counters = self.view.complaint_counters(profile_id)?;
        let effective = effective_complaints(&counters, self.height, &params);
        let level = self.view.loyalty_level(profile_id)?.unwrap_or(0);
        Ok(discounted_cost(base_cost, effective, level, &params))
    }

    /// Discount a ticket's current cost and record the discount.
    /// Returns the new cost.
    pub fn apply_discount_to_ticket(
        &self,
        caller: &Principal,
        ticket_id: TicketId,
    ) -> LedgerResult<Amount> {
        Ok(self.apply_one(caller, ticket_id)?.discounted_cost)
    }

    fn apply_one(&self, caller: &Principal, ticket_id: TicketId) -> LedgerResult<AppliedDiscount> {
        let height = self.height;
        let applied = self.store.atomic(|store| {
            let ticket = require(store.get_ticket(ticket_id)?, "ticket", ticket_id)?;
            let base_cost = ticket.cost;
            let discounted = self.calculate_discount(ticket.profile_id, base_cost)?;
            if discounted > base_cost {
                return Err(LedgerError::DiscountApplicationFailed {
                    ticket_id,
                    base_cost,
                    discounted_cost: discounted,
                });
            }
            let applied = AppliedDiscount { base_cost, discounted_cost: discounted };

            store.set_ticket_cost(ticket_id, discounted)?;
            store.upsert_discount(&DiscountRecord {
                profile_id: ticket.profile_id,
                ticket_id,
                applied_discount: applied.discount(),
                timestamp: height,
            })?;
            store.append_event(
                height,
                &LedgerEvent::DiscountApplied {
                    ticket_id,
                    discount: applied.discount(),
                    discounted_cost: discounted,
                },
            )?;
            Ok(applied)
        })?;
        log::debug!(
            "height={height} discount: {caller} applied {} off ticket #{ticket_id} ({} -> {})",
            applied.discount(),
            applied.base_cost,
            applied.discounted_cost,
        );
        Ok(applied)
    }

    /// Apply discounts to up to [`MAX_BATCH_SIZE`] tickets in list order and
    /// return the total discount.
    ///
    /// Fail-fast without back-out: each ticket commits on its own, the first
    /// failure stops the batch and is returned, and tickets before it stay
    /// discounted.
    pub fn batch_apply_discounts(
        &self,
        caller: &Principal,
        ticket_ids: &[TicketId],
    ) -> LedgerResult<Amount> {
        if ticket_ids.len() > MAX_BATCH_SIZE {
            return Err(LedgerError::BatchTooLarge {
                len: ticket_ids.len(),
                max: MAX_BATCH_SIZE,
            });
        }
        let mut total: Amount = 0;
        for (position, &ticket_id) in ticket_ids.iter().enumerate() {
            let applied = self.apply_one(caller, ticket_id).map_err(|err| {
                log::warn!(
                    "height={} discount: batch stopped at #{ticket_id} (position {position}) \
                     after committing {position} tickets: {err}",
                    self.height,
                );
                err
            })?;
            total = total
                .checked_add(applied.discount())
                .ok_or(LedgerError::ArithmeticOverflow { context: "batch discount total" })?;
        }
        Ok(total)
    }

    /// Sum of `calculate_discount` over paired profiles and base costs.
    /// Reads only; used for quoting.
    pub fn estimate_batch_discount(
        &self,
        profile_ids: &[ProfileId],
        base_costs: &[Amount],
    ) -> LedgerResult<Amount> {
        if profile_ids.len() != base_costs.len() {
            return Err(LedgerError::InvalidParam {
                field: "base_costs",
                value: format!("{} costs for {} profiles", base_costs.len(), profile_ids.len()),
            });
        }
        profile_ids
            .iter()
            .zip(base_costs)
            .try_fold(0u64, |sum, (&profile_id, &base_cost)| {
                let cost = self.calculate_discount(profile_id, base_cost)?;
                sum.checked_add(cost)
                    .ok_or(LedgerError::ArithmeticOverflow { context: "batch estimate" })
            })
    }

    /// What-if pricing against caller-supplied standing instead of stored
    /// state. The figures are read as if the last complaint were logged at
    /// the current height, so nothing has decayed yet.
    pub fn simulate_discount(
        &self,
        profile_id: ProfileId,
        base_cost: Amount,
        assumed_complaints: u64,
        assumed_unresolved: u64,
        assumed_level: u64,
    ) -> LedgerResult<Amount> {
        if assumed_unresolved > assumed_complaints {
            return Err(LedgerError::InvalidParam {
                field: "assumed_unresolved",
                value: format!("{assumed_unresolved} > {assumed_complaints} total"),
            });
        }
        let params = self.view.discount_params()?;
        let counters = ComplaintCounters {
            total_complaints:      assumed_complaints,
            unresolved_complaints: assumed_unresolved,
            last_complaint_height: self.height,
        };
        let effective = effective_complaints(&counters, self.height, &params);
        log::trace!("simulate: profile {profile_id} effective={effective} level={assumed_level}");
        Ok(discounted_cost(base_cost, effective, assumed_level, &params))
    }

    pub fn discount_history(
        &self,
        profile_id: ProfileId,
        ticket_id: TicketId,
    ) -> LedgerResult<Option<DiscountRecord>> {
        self.store.get_discount(profile_id, ticket_id)
    }

    // ── Config mutation ───────────────────────────────────────────

    pub fn set_max_discount(&self, caller: &Principal, value: u64) -> LedgerResult<()> {
        self.update_config(caller, ConfigField::MaxDiscount, value.to_string(), |p| {
            validate_max_discount(value)?;
            p.max_discount_pct = value;
            Ok(())
        })
    }

    pub fn set_complaint_threshold(&self, caller: &Principal, value: u64) -> LedgerResult<()> {
        self.update_config(caller, ConfigField::ComplaintThreshold, value.to_string(), |p| {
            validate_complaint_threshold(value)?;
            p.complaint_threshold = value;
            Ok(())
        })
    }

    pub fn set_decay_period(&self, caller: &Principal, value: Height) -> LedgerResult<()> {
        self.update_config(caller, ConfigField::DecayPeriod, value.to_string(), |p| {
            validate_decay_period(value)?;
            p.decay_period = value;
            Ok(())
        })
    }

    pub fn set_decay_factor(&self, caller: &Principal, value: u64) -> LedgerResult<()> {
        self.update_config(caller, ConfigField::DecayFactor, value.to_string(), |p| {
            validate_decay_factor(value)?;
            p.decay_factor_pct = value;
            Ok(())
        })
    }

    /// Hand every business right to `new_owner`.
    pub fn transfer_ownership(&self, caller: &Principal, new_owner: &Principal) -> LedgerResult<()> {
        self.update_config(caller, ConfigField::Owner, new_owner.clone(), |p| {
            p.owner = new_owner.clone();
            Ok(())
        })
    }

    fn update_config(
        &self,
        caller: &Principal,
        field: ConfigField,
        value: String,
        apply: impl FnOnce(&mut DiscountParams) -> LedgerResult<()>,
    ) -> LedgerResult<()> {
        let height = self.height;
        let result = self.store.atomic(|store| {
            let mut params = store.get_params()?;
            params.ensure_owner(caller, "config update")?;
            apply(&mut params)?;
            store.save_params(&params)?;
            store.append_event(height, &LedgerEvent::ConfigUpdated { field, value: value.clone() })
        });
        match &result {
            Ok(()) => log::info!("height={height} config: {} set to {value} by {caller}", field.as_str()),
            Err(err) => log::warn!("height={height} config: {} update rejected: {err}", field.as_str()),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> DiscountParams {
        DiscountParams {
            max_discount_pct:    20,
            complaint_threshold: 5,
            decay_period:        100,
            decay_factor_pct:    90,
            owner:               "business".into(),
        }
    }

    struct FixedView {
        level:    Option<u64>,
        counters: ComplaintCounters,
    }

    impl LoyaltyView for FixedView {
        fn loyalty_level(&self, _profile_id: ProfileId) -> LedgerResult<Option<u64>> {
            Ok(self.level)
        }
        fn complaint_counters(&self, _profile_id: ProfileId) -> LedgerResult<ComplaintCounters> {
            Ok(self.counters)
        }
        fn discount_params(&self) -> LedgerResult<DiscountParams> {
            Ok(params())
        }
    }

    #[test]
    fn level_two_without_complaints_gets_four_percent() {
        assert_eq!(discounted_cost(1000, 0, 2, &params()), 960);
    }

    #[test]
    fn level_five_adds_tier_bonus() {
        assert_eq!(discounted_cost(1000, 0, 5, &params()), 850);
    }

    #[test]
    fn level_three_with_open_complaint_stays_under_threshold() {
        let counters = ComplaintCounters {
            total_complaints:      2,
            unresolved_complaints: 1,
            last_complaint_height: 1000,
        };
        let effective = effective_complaints(&counters, 1000, &params());
        assert_eq!(effective, 3);
        assert_eq!(discounted_cost(1000, effective, 3, &params()), 910);
    }

    #[test]
    fn one_elapsed_period_decays_ten_to_nine() {
        let counters = ComplaintCounters {
            total_complaints:      10,
            unresolved_complaints: 0,
            last_complaint_height: 900,
        };
        assert_eq!(effective_complaints(&counters, 1000, &params()), 9);
    }

    #[test]
    fn decay_compounds_on_the_fraction() {
        // 10 * 0.9^2 = 8.1
        assert_eq!(decayed_total(10, 2, 90), 8);
        // 100 * 0.5^3 = 12.5
        assert_eq!(decayed_total(100, 3, 50), 12);
        assert_eq!(decayed_total(7, 5, 100), 7);
        assert_eq!(decayed_total(7, 1, 0), 0);
        assert_eq!(decayed_total(u64::MAX, 3, 99), (u64::MAX as u128 * 970_299 / 1_000_000) as u64);
    }

    #[test]
    fn decay_is_non_increasing_over_height() {
        let counters = ComplaintCounters {
            total_complaints:      40,
            unresolved_complaints: 2,
            last_complaint_height: 50,
        };
        let mut previous = u64::MAX;
        for height in (50..5_000).step_by(37) {
            let effective = effective_complaints(&counters, height, &params());
            assert!(effective <= previous, "effective rose at height {height}");
            assert!(effective >= counters.unresolved_complaints);
            previous = effective;
        }
        assert_eq!(previous, 2, "history fades, open complaints stay");
    }

    #[test]
    fn over_threshold_means_full_price() {
        assert_eq!(discounted_cost(1000, 6, 5, &params()), 1000);
        assert_eq!(discounted_cost(1000, 5, 5, &params()), 850);
    }

    #[test]
    fn percentage_is_capped_so_cost_never_goes_negative() {
        let mut p = params();
        p.max_discount_pct = 100;
        assert_eq!(discounted_cost(1000, 0, 10, &p), 0);
        assert_eq!(discounted_cost(u64::MAX, 0, u64::MAX, &p), 0);
        assert_eq!(discounted_cost(0, 0, 5, &p), 0);
    }

    #[test]
    fn tier_bonus_thresholds() {
        assert_eq!(tier_bonus(0), 0);
        assert_eq!(tier_bonus(2), 0);
        assert_eq!(tier_bonus(3), 3);
        assert_eq!(tier_bonus(4), 3);
        assert_eq!(tier_bonus(5), 5);
        assert_eq!(tier_bonus(50), 5);
    }

    #[test]
    fn engine_reads_through_injected_view() {
        let store = LedgerStore::in_memory().unwrap();
        let view = FixedView {
            level:    Some(5),
            counters: ComplaintCounters::default(),
        };
        let engine = DiscountEngine::new(&store, &view, 10);
        assert_eq!(engine.calculate_discount(1, 1000).unwrap(), 850);
        assert_eq!(engine.estimate_batch_discount(&[1, 2], &[1000, 200]).unwrap(), 850 + 170);

        let unknown = FixedView { level: None, counters: ComplaintCounters::default() };
        let engine = DiscountEngine::new(&store, &unknown, 10);
        assert_eq!(engine.calculate_discount(99, 1000).unwrap(), 1000);
    }

    #[test]
    fn simulation_matches_stored_formula() {
        let store = LedgerStore::in_memory().unwrap();
        let view = FixedView {
            level:    Some(3),
            counters: ComplaintCounters {
                total_complaints:      2,
                unresolved_complaints: 1,
                last_complaint_height: 10,
            },
        };
        let engine = DiscountEngine::new(&store, &view, 10);
        assert_eq!(
            engine.simulate_discount(1, 1000, 2, 1, 3).unwrap(),
            engine.calculate_discount(1, 1000).unwrap(),
        );
        // 4 + 2 = 6 > 5
        assert_eq!(engine.simulate_discount(1, 1000, 4, 2, 5).unwrap(), 1000);
        assert!(matches!(
            engine.simulate_discount(1, 1000, 1, 2, 5),
            Err(LedgerError::InvalidParam { field: "assumed_unresolved", .. })
        ));
    }

    #[test]
    fn estimate_rejects_unpaired_lists() {
        let store = LedgerStore::in_memory().unwrap();
        let view = FixedView { level: Some(1), counters: ComplaintCounters::default() };
        let engine = DiscountEngine::new(&store, &view, 0);
        assert!(matches!(
            engine.estimate_batch_discount(&[1, 2], &[100]),
            Err(LedgerError::InvalidParam { field: "base_costs", .. })
        ));
    }
}
