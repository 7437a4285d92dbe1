//! Portion levels and their translation into stepper steps.
//!
//! Portion size is open-loop: a level is a multiplier of dispense units,
//! and one unit is a fixed number of stepper steps calibrated per device.

use core::fmt;

use crate::error::LevelError;

/// Portion multiplier in `1..=10`.  Construction validates the range, so a
/// `PortionLevel` value is always dispensable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PortionLevel(u8);

impl PortionLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Validate `n` as a portion level.
    pub fn new(n: i32) -> Result<Self, LevelError> {
        if (Self::MIN as i32..=Self::MAX as i32).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(LevelError::OutOfRange(n))
        }
    }

    /// Saturate `n` into `1..=10`.  Used for manual feeds, which are
    /// clamped rather than rejected.
    pub fn clamped(n: i32) -> Self {
        Self(n.clamp(Self::MIN as i32, Self::MAX as i32) as u8)
    }

    pub fn units(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PortionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Translates portion levels into step counts.
#[derive(Debug, Clone, Copy)]
pub struct PortionPolicy {
    steps_per_unit: u32,
}

impl PortionPolicy {
    pub fn new(steps_per_unit: u32) -> Self {
        Self { steps_per_unit }
    }

    /// Steps needed to dispense `level` units.
    pub fn steps_for(&self, level: PortionLevel) -> u32 {
        self.steps_per_unit.saturating_mul(level.units() as u32)
    }
}
