//! Pipeline errors and recoverable warnings.

use super::sink::SinkError;
use crate::acquisition::ShapeError;
use crate::config::ConfigError;
use crate::types::{DetectorSide, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Hard stop for the current chunk. Nothing of the chunk is emitted.
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("Shape resolution failed: {0}")]
    Shape(#[from] ShapeError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Invalid study config: {0}")]
    Config(#[from] ConfigError),

    #[error("Topology table has no layers")]
    EmptyTopology,

    #[error("Region of interest ends at chip {roi_chip_bound} but the topology only has {total_chips} chips")]
    RegionOutsideTopology { roi_chip_bound: u32, total_chips: u32 },
}

/// Recoverable condition, logged when it happens and kept in the chunk summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StudyWarning {
    /// An accepted pulse hit an already tagged `(cycle, slot)`.
    DuplicateTag {
        side: DetectorSide,
        timestamp: Timestamp,
    },
    /// The frame count fits no known chunk layout; the fallback strobe was used.
    UnexpectedChunkShape { frames: usize, fallback: u16 },
}

impl fmt::Display for StudyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTag { side, timestamp } => {
                write!(f, "duplicate background tag on side {side} at {timestamp}")
            }
            Self::UnexpectedChunkShape { frames, fallback } => write!(
                f,
                "unexpected chunk shape ({frames} frames), using fallback strobe length {fallback}"
            ),
        }
    }
}
