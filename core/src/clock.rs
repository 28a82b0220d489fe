//! Ledger clock: owns the current height.
//!
//! RULE: Components read the height once, when their handle is created.
//! Only the engine moves the clock, and only between transactions.

use crate::{
    error::{LedgerError, LedgerResult},
    types::Height,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LedgerClock {
    pub current_height: Height,
}

impl LedgerClock {
    pub fn at(current_height: Height) -> Self {
        Self { current_height }
    }

    /// Move to `height`. Staying put is allowed; moving back is not.
    pub fn advance_to(&mut self, height: Height) -> LedgerResult<Height> {
        if height < self.current_height {
            return Err(LedgerError::HeightRegression {
                current:   self.current_height,
                requested: height,
            });
        }
        self.current_height = height;
        Ok(self.current_height)
    }

    pub fn advance_by(&mut self, delta: Height) -> LedgerResult<Height> {
        let next = self
            .current_height
            .checked_add(delta)
            .ok_or(LedgerError::ArithmeticOverflow { context: "clock advance" })?;
        self.advance_to(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_is_non_decreasing() {
        let mut clock = LedgerClock::at(10);
        assert_eq!(clock.advance_to(10).unwrap(), 10);
        assert_eq!(clock.advance_by(5).unwrap(), 15);

        let err = clock.advance_to(14).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::HeightRegression { current: 15, requested: 14 }
        ));
        assert_eq!(clock.current_height, 15, "failed advance must not move the clock");
    }

    #[test]
    fn advance_by_rejects_overflow() {
        let mut clock = LedgerClock::at(u64::MAX - 1);
        assert!(matches!(
            clock.advance_by(2),
            Err(LedgerError::ArithmeticOverflow { .. })
        ));
    }
}
