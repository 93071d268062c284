//! Inbound records handed over by the acquisition side, one chunk at a time.

use super::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two ZDC neutron calorimeters produced a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DetectorSide {
    A,
    C,
}

impl DetectorSide {
    pub const ALL: [Self; 2] = [Self::A, Self::C];

    /// Bit this side occupies in a frame tag mask.
    pub const fn mask_bit(self) -> u8 {
        match self {
            Self::A => 0b01,
            Self::C => 0b10,
        }
    }
}

impl fmt::Display for DetectorSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::C => write!(f, "C"),
        }
    }
}

/// One calibrated TDC pulse from the background detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPulse {
    pub timestamp: Timestamp,
    pub side: DetectorSide,
    /// Calibrated TDC value (ns).
    pub calibrated_value: f64,
}

/// A cluster with its shape already resolved against the pattern dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub chip: u32,
    pub pixel_count: u32,
    pub column_span: u32,
    pub row_span: u32,
}

/// One readout frame: every cluster sharing a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub clusters: Vec<ClusterRecord>,
}

/// Everything the processor needs for one chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkInput {
    #[serde(default)]
    pub pulses: Vec<BackgroundPulse>,
    #[serde(default)]
    pub frames: Vec<Frame>,
}
