//! Cyclic Time Model
//!
//! A detector timestamp is a `(cycle, slot)` pair: the cycle (LHC orbit) is an
//! unbounded counter, the slot (bunch crossing) lives in `[0, CYCLE_LENGTH)`.
//! Timestamps from different cycles are compared through [`distance`], never by
//! subtracting raw fields.
//!
//! ```
//! use its_bkg_study::Timestamp;
//!
//! # fn main() -> Result<(), its_bkg_study::types::TimestampError> {
//! let a = Timestamp::new(5, 3560)?;
//! let b = Timestamp::new(6, 4)?;
//! assert_eq!(a.distance_to(b), 8);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of slots in one full cycle.
pub const CYCLE_LENGTH: u16 = 3564;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Invalid timestamp {cycle}/{slot}: slot must be below {CYCLE_LENGTH}")]
    InvalidTimestamp { cycle: u64, slot: u16 },
}

// ============================================================================
// Timestamp
// ============================================================================

/// Wire form of a timestamp, validated on the way in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawTimestamp {
    pub cycle: u64,
    pub slot: u16,
}

/// A validated `(cycle, slot)` timestamp.
///
/// Field order makes the derived `Ord` chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimestamp", into = "RawTimestamp")]
pub struct Timestamp {
    cycle: u64,
    slot: u16,
}

impl Timestamp {
    /// Build a timestamp, rejecting slots outside the cycle.
    pub fn new(cycle: u64, slot: u16) -> Result<Self, TimestampError> {
        if slot >= CYCLE_LENGTH {
            return Err(TimestampError::InvalidTimestamp { cycle, slot });
        }
        Ok(Self { cycle, slot })
    }

    pub const fn cycle(self) -> u64 {
        self.cycle
    }

    pub const fn slot(self) -> u16 {
        self.slot
    }

    /// Index of the strobe window this timestamp falls in.
    pub const fn window(self, strobe_length: u16) -> u16 {
        self.slot / strobe_length
    }

    /// Signed slots to advance from `self` to reach `other`.
    pub fn distance_to(self, other: Self) -> i64 {
        distance(self, other)
    }
}

impl TryFrom<RawTimestamp> for Timestamp {
    type Error = TimestampError;

    fn try_from(raw: RawTimestamp) -> Result<Self, Self::Error> {
        Self::new(raw.cycle, raw.slot)
    }
}

impl From<Timestamp> for RawTimestamp {
    fn from(ts: Timestamp) -> Self {
        Self {
            cycle: ts.cycle,
            slot: ts.slot,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cycle, self.slot)
    }
}

/// Signed number of slots from `a` to `b` on the cyclic ruler.
///
/// Computed in `i128` and clamped to `±i64::MAX`, so `distance(a, b) ==
/// -distance(b, a)` holds for every pair of valid timestamps.
pub fn distance(a: Timestamp, b: Timestamp) -> i64 {
    let cycles = i128::from(b.cycle) - i128::from(a.cycle);
    let slots = i128::from(b.slot) - i128::from(a.slot);
    let total = cycles * i128::from(CYCLE_LENGTH) + slots;
    let clamped = total.clamp(-i128::from(i64::MAX), i128::from(i64::MAX));
    // In range after the clamp.
    clamped as i64
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(cycle: u64, slot: u16) -> Timestamp {
        Timestamp::new(cycle, slot).unwrap()
    }

    #[test]
    fn test_same_cycle_is_plain_difference() {
        assert_eq!(distance(ts(10, 100), ts(10, 250)), 150);
        assert_eq!(distance(ts(10, 250), ts(10, 100)), -150);
    }

    #[test]
    fn test_cycle_wrap() {
        assert_eq!(distance(ts(5, 3560), ts(6, 4)), 8);
        assert_eq!(distance(ts(6, 4), ts(5, 3560)), -8);
    }

    #[test]
    fn test_many_cycles() {
        assert_eq!(distance(ts(0, 0), ts(3, 0)), 3 * 3564);
        assert_eq!(distance(ts(3, 10), ts(0, 0)), -(3 * 3564 + 10));
    }

    #[test]
    fn test_extreme_cycles_stay_antisymmetric() {
        let a = ts(0, 0);
        let b = ts(u64::MAX, CYCLE_LENGTH - 1);
        assert_eq!(distance(a, b), i64::MAX);
        assert_eq!(distance(b, a), -i64::MAX);
    }

    #[test]
    fn test_invalid_slot_rejected() {
        let err = Timestamp::new(1, CYCLE_LENGTH).unwrap_err();
        assert_eq!(err, TimestampError::InvalidTimestamp { cycle: 1, slot: 3564 });
    }

    #[test]
    fn test_window_index() {
        assert_eq!(ts(1, 0).window(594), 0);
        assert_eq!(ts(1, 593).window(594), 0);
        assert_eq!(ts(1, 594).window(594), 1);
        assert_eq!(ts(1, 3563).window(594), 5);
    }

    #[test]
    fn test_ordering_is_chronological() {
        assert!(ts(1, 3000) < ts(2, 0));
        assert!(ts(2, 0) < ts(2, 1));
    }

    #[test]
    fn test_deserialize_rejects_bad_slot() {
        let ok: Result<Timestamp, _> = serde_json::from_str(r#"{"cycle": 7, "slot": 12}"#);
        assert_eq!(ok.unwrap(), ts(7, 12));
        let bad: Result<Timestamp, _> = serde_json::from_str(r#"{"cycle": 7, "slot": 4000}"#);
        assert!(bad.is_err(), "slot 4000 must not deserialize");
    }
}
