//! Detector Topology Map
//!
//! Maps a flat chip index to its layer, stave and azimuth. Chip indices
//! increase layer by layer; within a layer, `chips_per_stave` consecutive chips
//! form a stave, and staves are spread evenly in azimuth with the first stave
//! centred half a stave pitch above zero.
//!
//! The table is immutable once built and is shared by reference, so it is safe
//! to use from several chunk workers at once.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Stave layout of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub staves: u32,
    pub chips_per_stave: u32,
}

impl LayerSpec {
    pub const fn chip_count(self) -> u32 {
        self.staves * self.chips_per_stave
    }
}

/// ITS layout: three inner-barrel layers of 9-chip staves, two middle and two
/// outer layers.
pub const ITS_LAYERS: [LayerSpec; 7] = [
    LayerSpec { staves: 12, chips_per_stave: 9 },
    LayerSpec { staves: 16, chips_per_stave: 9 },
    LayerSpec { staves: 20, chips_per_stave: 9 },
    LayerSpec { staves: 24, chips_per_stave: 112 },
    LayerSpec { staves: 30, chips_per_stave: 112 },
    LayerSpec { staves: 42, chips_per_stave: 196 },
    LayerSpec { staves: 48, chips_per_stave: 196 },
];

/// Azimuthal sector flagged for the restricted anomaly counter (top of barrel).
pub const DEFAULT_DEAD_ZONE: (f64, f64) = (FRAC_PI_2, PI);

/// Where a chip sits in the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologyEntry {
    pub layer: u32,
    /// Stave index within the layer.
    pub stave_in_layer: u32,
    /// Stave azimuth in `[0, 2π)`.
    pub azimuth: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopologyTable {
    layers: Vec<LayerSpec>,
    /// First chip index of each layer.
    first_chip: Vec<u32>,
    total_chips: u32,
    dead_zone: (f64, f64),
}

impl TopologyTable {
    pub fn new(layers: Vec<LayerSpec>, dead_zone: (f64, f64)) -> Self {
        let mut first_chip = Vec::with_capacity(layers.len());
        let mut total_chips = 0u32;
        for layer in &layers {
            first_chip.push(total_chips);
            total_chips = total_chips.saturating_add(layer.chip_count());
        }
        Self {
            layers,
            first_chip,
            total_chips,
            dead_zone,
        }
    }

    pub fn its() -> Self {
        Self::new(ITS_LAYERS.to_vec(), DEFAULT_DEAD_ZONE)
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn total_chips(&self) -> u32 {
        self.total_chips
    }

    /// Cumulative chip count at the end of each layer.
    pub fn layer_thresholds(&self) -> impl Iterator<Item = u32> + '_ {
        self.first_chip
            .iter()
            .zip(&self.layers)
            .map(|(&first, layer)| first + layer.chip_count())
    }

    /// Layer of `chip`. Chips past the last threshold belong to the last layer.
    pub fn layer_of(&self, chip: u32) -> Option<u32> {
        if self.layers.is_empty() {
            return None;
        }
        let idx = self
            .layer_thresholds()
            .position(|end| chip < end)
            .unwrap_or(self.layers.len() - 1);
        u32::try_from(idx).ok()
    }

    pub fn locate(&self, chip: u32) -> Option<TopologyEntry> {
        let layer = self.layer_of(chip)?;
        let idx = layer as usize;
        let spec = self.layers[idx];
        if spec.staves == 0 || spec.chips_per_stave == 0 {
            return None;
        }
        let stave_in_layer = ((chip - self.first_chip[idx]) / spec.chips_per_stave).min(spec.staves - 1);
        let azimuth = TAU * (0.5 + f64::from(stave_in_layer)) / f64::from(spec.staves);
        Some(TopologyEntry {
            layer,
            stave_in_layer,
            azimuth,
        })
    }

    pub fn azimuth(&self, chip: u32) -> Option<f64> {
        self.locate(chip).map(|e| e.azimuth)
    }

    /// Whether `angle` lies strictly inside the dead-zone sector.
    pub fn is_dead_zone_azimuth(&self, angle: f64) -> bool {
        angle > self.dead_zone.0 && angle < self.dead_zone.1
    }

    pub fn is_dead_zone_chip(&self, chip: u32) -> bool {
        self.azimuth(chip)
            .is_some_and(|phi| self.is_dead_zone_azimuth(phi))
    }
}

impl Default for TopologyTable {
    fn default() -> Self {
        Self::its()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_its_layer_thresholds() {
        let table = TopologyTable::its();
        let thresholds: Vec<u32> = table.layer_thresholds().collect();
        assert_eq!(thresholds, vec![108, 252, 432, 3120, 6480, 14712, 24120]);
    }

    #[test]
    fn test_layer_of() {
        let table = TopologyTable::its();
        assert_eq!(table.layer_of(0), Some(0));
        assert_eq!(table.layer_of(107), Some(0));
        assert_eq!(table.layer_of(108), Some(1));
        assert_eq!(table.layer_of(431), Some(2));
        assert_eq!(table.layer_of(432), Some(3));
        assert_eq!(table.layer_of(14712), Some(6));
        assert_eq!(table.layer_of(99_999), Some(6));
    }

    #[test]
    fn test_azimuth_of_first_and_last_stave() {
        let table = TopologyTable::its();
        let first = table.locate(0).unwrap();
        assert_eq!(first.stave_in_layer, 0);
        assert!((first.azimuth - TAU * 0.5 / 12.0).abs() < 1e-12);

        let last = table.locate(107).unwrap();
        assert_eq!(last.stave_in_layer, 11);
        assert!((last.azimuth - TAU * 11.5 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_stave_in_second_layer() {
        let table = TopologyTable::its();
        // Chip 108 + 9*5 starts the sixth stave of layer 1.
        let entry = table.locate(153).unwrap();
        assert_eq!(entry.layer, 1);
        assert_eq!(entry.stave_in_layer, 5);
        assert!((entry.azimuth - TAU * 5.5 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_dead_zone() {
        let table = TopologyTable::its();
        assert!(!table.is_dead_zone_azimuth(FRAC_PI_2));
        assert!(table.is_dead_zone_azimuth(2.0));
        assert!(!table.is_dead_zone_azimuth(PI));
        // Layer 0, stave 3: 2π·3.5/12 ≈ 1.83 rad
        assert!(table.is_dead_zone_chip(27));
        // Layer 0, stave 0: ≈ 0.26 rad
        assert!(!table.is_dead_zone_chip(0));
    }

    #[test]
    fn test_synthetic_geometry() {
        let table = TopologyTable::new(
            vec![
                LayerSpec { staves: 2, chips_per_stave: 3 },
                LayerSpec { staves: 4, chips_per_stave: 1 },
            ],
            (0.0, 1.0),
        );
        assert_eq!(table.total_chips(), 10);
        assert_eq!(table.locate(5).unwrap().stave_in_layer, 1);
        let entry = table.locate(9).unwrap();
        assert_eq!(entry.layer, 1);
        assert_eq!(entry.stave_in_layer, 3);
    }

    #[test]
    fn test_empty_table() {
        let table = TopologyTable::new(Vec::new(), DEFAULT_DEAD_ZONE);
        assert_eq!(table.layer_of(0), None);
        assert!(table.locate(0).is_none());
    }
}
