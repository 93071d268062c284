//! Tag index construction from raw background pulses.
//!
//! Every pulse is histogrammed; pulses whose calibrated value falls inside the
//! acceptance window (inclusive on both ends) tag their `(cycle, slot)` on the
//! pulse's side. The window is a detector calibration constant taken from
//! [`TaggingConfig`].

use super::histogram::Histogram1D;
use super::tag_index::{BackgroundTagIndex, NearestTags, TagInsert};
use crate::config::TaggingConfig;
use crate::types::{BackgroundPulse, DetectorSide, Timestamp, CYCLE_LENGTH};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// Tag Mask
// ============================================================================

/// Per-frame tag bitmask: bit0 = side A, bit1 = side C, 0 = untagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMask(u8);

impl TagMask {
    pub const UNTAGGED: Self = Self(0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_tagged(self) -> bool {
        self.0 != 0
    }

    pub const fn has(self, side: DetectorSide) -> bool {
        self.0 & side.mask_bit() != 0
    }

    #[must_use]
    pub const fn with(self, side: DetectorSide) -> Self {
        Self(self.0 | side.mask_bit())
    }
}

// ============================================================================
// Per-side Indices
// ============================================================================

/// One tag index per detector side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideTags {
    a: BackgroundTagIndex,
    c: BackgroundTagIndex,
}

impl SideTags {
    pub fn side(&self, side: DetectorSide) -> &BackgroundTagIndex {
        match side {
            DetectorSide::A => &self.a,
            DetectorSide::C => &self.c,
        }
    }

    fn side_mut(&mut self, side: DetectorSide) -> &mut BackgroundTagIndex {
        match side {
            DetectorSide::A => &mut self.a,
            DetectorSide::C => &mut self.c,
        }
    }

    /// Tag mask of a frame: a side's bit is set when that side has a tag in
    /// the frame's own cycle and strobe window.
    pub fn tag_mask(&self, ts: Timestamp, strobe_length: u16) -> TagMask {
        DetectorSide::ALL
            .into_iter()
            .filter(|&side| self.side(side).tags_window(ts, strobe_length))
            .fold(TagMask::UNTAGGED, TagMask::with)
    }

    pub fn nearest(&self, side: DetectorSide, ts: Timestamp) -> NearestTags {
        self.side(side).nearest_around(ts)
    }
}

// ============================================================================
// Build Report
// ============================================================================

/// Per-side bookkeeping gathered while building the indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideDiagnostics {
    pub pulses_seen: u64,
    pub pulses_accepted: u64,
    /// Accepted pulses whose `(cycle, slot)` was already tagged.
    pub duplicates: Vec<Timestamp>,
    /// Calibrated value of every pulse, before the acceptance cut.
    pub calibrated_values: Histogram1D,
    /// Slot of every accepted pulse.
    pub tagged_slots: Histogram1D,
}

impl SideDiagnostics {
    fn new(cfg: &TaggingConfig) -> Self {
        Self {
            pulses_seen: 0,
            pulses_accepted: 0,
            duplicates: Vec::new(),
            calibrated_values: Histogram1D::new(
                cfg.value_histogram_bins,
                cfg.value_histogram_low,
                cfg.value_histogram_high,
            ),
            tagged_slots: Histogram1D::new(
                usize::from(CYCLE_LENGTH),
                0.0,
                f64::from(CYCLE_LENGTH),
            ),
        }
    }

    fn merge(&mut self, other: &Self) {
        self.pulses_seen += other.pulses_seen;
        self.pulses_accepted += other.pulses_accepted;
        self.duplicates.extend_from_slice(&other.duplicates);
        self.calibrated_values.merge(&other.calibrated_values);
        self.tagged_slots.merge(&other.tagged_slots);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDiagnostics {
    pub side_a: SideDiagnostics,
    pub side_c: SideDiagnostics,
}

impl TagDiagnostics {
    pub fn side(&self, side: DetectorSide) -> &SideDiagnostics {
        match side {
            DetectorSide::A => &self.side_a,
            DetectorSide::C => &self.side_c,
        }
    }

    fn side_mut(&mut self, side: DetectorSide) -> &mut SideDiagnostics {
        match side {
            DetectorSide::A => &mut self.side_a,
            DetectorSide::C => &mut self.side_c,
        }
    }

    /// Fold another chunk's diagnostics into these (run-level totals).
    pub fn merge(&mut self, other: &Self) {
        self.side_a.merge(&other.side_a);
        self.side_c.merge(&other.side_c);
    }
}

// ============================================================================
// Builder
// ============================================================================

pub struct TagIndexBuilder<'a> {
    config: &'a TaggingConfig,
    tags: SideTags,
    diagnostics: TagDiagnostics,
}

impl<'a> TagIndexBuilder<'a> {
    pub fn new(config: &'a TaggingConfig) -> Self {
        Self {
            config,
            tags: SideTags::default(),
            diagnostics: TagDiagnostics {
                side_a: SideDiagnostics::new(config),
                side_c: SideDiagnostics::new(config),
            },
        }
    }

    pub fn accepts(&self, calibrated_value: f64) -> bool {
        (self.config.acceptance_min..=self.config.acceptance_max).contains(&calibrated_value)
    }

    pub fn push(&mut self, pulse: &BackgroundPulse) {
        let accepted = self.accepts(pulse.calibrated_value);
        let diag = self.diagnostics.side_mut(pulse.side);
        diag.pulses_seen += 1;
        diag.calibrated_values.fill(pulse.calibrated_value);
        if !accepted {
            return;
        }

        diag.pulses_accepted += 1;
        diag.tagged_slots.fill(f64::from(pulse.timestamp.slot()));
        if self.tags.side_mut(pulse.side).insert(pulse.timestamp) == TagInsert::Duplicate {
            warn!(
                side = %pulse.side,
                timestamp = %pulse.timestamp,
                "Multiple background counts in the same cycle/slot"
            );
            diag.duplicates.push(pulse.timestamp);
        }
    }

    pub fn extend<'p>(&mut self, pulses: impl IntoIterator<Item = &'p BackgroundPulse>) {
        for pulse in pulses {
            self.push(pulse);
        }
    }

    pub fn finish(self) -> (SideTags, TagDiagnostics) {
        for side in DetectorSide::ALL {
            let index = self.tags.side(side);
            info!(
                side = %side,
                seen = self.diagnostics.side(side).pulses_seen,
                tagged = index.len(),
                "Background tag index built"
            );
            for ts in index.iter() {
                debug!(side = %side, timestamp = %ts, "Background tag");
            }
        }
        (self.tags, self.diagnostics)
    }

    /// Build both indices from a chunk's pulses in one pass.
    pub fn build<'p>(
        config: &'a TaggingConfig,
        pulses: impl IntoIterator<Item = &'p BackgroundPulse>,
    ) -> (SideTags, TagDiagnostics) {
        let mut builder = Self::new(config);
        builder.extend(pulses);
        builder.finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
