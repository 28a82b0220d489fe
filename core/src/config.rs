use crate::{
    error::{LedgerError, LedgerResult},
    types::{Amount, Height, Principal},
};
use serde::{Deserialize, Serialize};

/// The mutable configuration singleton. Written at genesis, then changed
/// only through the owner-gated setters on the discount engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountParams {
    pub max_discount_pct:    u64,
    pub complaint_threshold: u64,
    pub decay_period:        Height,
    pub decay_factor_pct:    u64,
    pub owner:               Principal,
}

impl DiscountParams {
    pub fn validate(&self) -> LedgerResult<()> {
        validate_max_discount(self.max_discount_pct)?;
        validate_complaint_threshold(self.complaint_threshold)?;
        validate_decay_period(self.decay_period)?;
        validate_decay_factor(self.decay_factor_pct)?;
        Ok(())
    }

    /// Business-only actions require the caller to be the stored owner.
    pub fn ensure_owner(&self, caller: &Principal, action: &'static str) -> LedgerResult<()> {
        if caller != &self.owner {
            return Err(LedgerError::NotAuthorized { caller: caller.clone(), action });
        }
        Ok(())
    }
}

/// Names of the configuration fields, as carried by `ConfigUpdated` events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    MaxDiscount,
    ComplaintThreshold,
    DecayPeriod,
    DecayFactor,
    Owner,
}

impl ConfigField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxDiscount        => "max_discount",
            Self::ComplaintThreshold => "complaint_threshold",
            Self::DecayPeriod        => "decay_period",
            Self::DecayFactor        => "decay_factor",
            Self::Owner              => "owner",
        }
    }
}

// ── Range checks ───────────────────────────────────────────────────

fn invalid(field: &'static str, value: u64) -> LedgerError {
    LedgerError::InvalidParam { field, value: value.to_string() }
}

/// Max discount must lie in (0, 100].
pub fn validate_max_discount(value: u64) -> LedgerResult<()> {
    if value == 0 || value > 100 {
        return Err(invalid("max_discount_pct", value));
    }
    Ok(())
}

pub fn validate_complaint_threshold(value: u64) -> LedgerResult<()> {
    if value == 0 {
        return Err(invalid("complaint_threshold", value));
    }
    Ok(())
}

pub fn validate_decay_period(value: Height) -> LedgerResult<()> {
    if value == 0 {
        return Err(invalid("decay_period", value));
    }
    Ok(())
}

/// Decay factor is a percentage retained per period, in [0, 100].
pub fn validate_decay_factor(value: u64) -> LedgerResult<()> {
    if value > 100 {
        return Err(invalid("decay_factor_pct", value));
    }
    Ok(())
}

// ── Genesis configuration ──────────────────────────────────────────

/// Genesis configuration, loaded from `data/ledger_config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub owner:               Principal,
    pub max_discount_pct:    u64,
    pub complaint_threshold: u64,
    pub decay_period:        Height,
    pub decay_factor_pct:    u64,
    /// Base reward; the n-th reward for a profile pays `n * reward_per_repair`.
    pub reward_per_repair:   Amount,
    /// Token balance needed to propose or vote.
    pub min_stake:           Amount,
}

impl LedgerConfig {
    /// Load from a JSON file.
    /// In tests, use LedgerConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: LedgerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            owner:               "business".into(),
            max_discount_pct:    20,
            complaint_threshold: 5,
            decay_period:        100,
            decay_factor_pct:    90,
            reward_per_repair:   10,
            min_stake:           100,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        self.genesis_params().validate()
    }

    /// The mutable part of the config, as seeded into the store.
    pub fn genesis_params(&self) -> DiscountParams {
        DiscountParams {
            max_discount_pct:    self.max_discount_pct,
            complaint_threshold: self.complaint_threshold,
            decay_period:        self.decay_period,
            decay_factor_pct:    self.decay_factor_pct,
            owner:               self.owner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test_config_is_valid() {
        LedgerConfig::default_test().validate().unwrap();
    }

    #[test]
    fn range_checks_match_invariants() {
        assert!(validate_max_discount(0).is_err());
        assert!(validate_max_discount(1).is_ok());
        assert!(validate_max_discount(100).is_ok());
        assert!(validate_max_discount(101).is_err());

        assert!(validate_complaint_threshold(0).is_err());
        assert!(validate_complaint_threshold(1).is_ok());

        assert!(validate_decay_period(0).is_err());
        assert!(validate_decay_period(1).is_ok());

        assert!(validate_decay_factor(0).is_ok());
        assert!(validate_decay_factor(100).is_ok());
        assert!(validate_decay_factor(101).is_err());
    }

    #[test]
    fn invalid_genesis_is_rejected() {
        let mut config = LedgerConfig::default_test();
        config.decay_period = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidParam { field: "decay_period", .. }
        ));
    }

    #[test]
    fn parses_from_json() {
        let json = r#"{
            "owner": "acme-repairs",
            "max_discount_pct": 25,
            "complaint_threshold": 3,
            "decay_period": 144,
            "decay_factor_pct": 80,
            "reward_per_repair": 5,
            "min_stake": 50
        }"#;
        let config: LedgerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.owner, "acme-repairs");
        assert_eq!(config.genesis_params().decay_factor_pct, 80);
    }
}
