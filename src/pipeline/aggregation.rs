//! Chip and Stave Aggregation
//!
//! Statistics are frame-local: every function here sees only the clusters of
//! one chip (or the chip statistics of one stave) in one frame.
//!
//! ## Chip statistics
//!
//! - pixel sum, mean and population standard deviation
//!   (`sqrt(E[X²] - E[X]²)`, clamped at zero against rounding)
//! - largest cluster and mean of the `top_n` largest clusters
//! - threshold counters, all inclusive (`>=`)
//! - shape-anomaly count

use crate::config::{AnomalyConfig, ClusterSizeConfig};
use crate::types::{ChipStats, ClusterRecord, StaveRecord, Timestamp};

/// Compute one chip's statistics from its clusters in this frame.
pub fn chip_stats(
    clusters: &[ClusterRecord],
    sizes: &ClusterSizeConfig,
    anomaly: &AnomalyConfig,
) -> ChipStats {
    if clusters.is_empty() {
        return ChipStats::default();
    }

    let n = clusters.len() as f64;
    let mut total_pixels = 0u64;
    let mut sum_sq = 0.0;
    let mut size_counts = [0u32; 3];
    let mut column_counts = [0u32; 3];
    let mut n_target = 0u32;

    for c in clusters {
        total_pixels += u64::from(c.pixel_count);
        sum_sq += f64::from(c.pixel_count).powi(2);
        for (count, &threshold) in size_counts.iter_mut().zip(&sizes.pixel_thresholds) {
            *count += u32::from(c.pixel_count >= threshold);
        }
        for (count, &threshold) in column_counts.iter_mut().zip(&sizes.column_thresholds) {
            *count += u32::from(c.column_span >= threshold);
        }
        n_target += u32::from(anomaly.is_anomalous(c.column_span, c.row_span));
    }

    let mean_pixels = total_pixels as f64 / n;
    let variance = (sum_sq / n - mean_pixels * mean_pixels).max(0.0);

    let mut pixels: Vec<u32> = clusters.iter().map(|c| c.pixel_count).collect();
    pixels.sort_unstable_by(|a, b| b.cmp(a));
    let top = &pixels[..sizes.top_n.min(pixels.len())];
    let top_n_mean = if top.is_empty() {
        0.0
    } else {
        top.iter().map(|&p| f64::from(p)).sum::<f64>() / top.len() as f64
    };

    ChipStats {
        cluster_count: u32::try_from(clusters.len()).unwrap_or(u32::MAX),
        total_pixels,
        mean_pixels,
        stdev_pixels: variance.sqrt(),
        largest_cluster: pixels[0],
        top_n_mean,
        size_counts,
        column_counts,
        n_target,
    }
}

/// Running sum of the chips of one stave in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaveAccumulator {
    chip_count: u32,
    cluster_count: u32,
    total_pixels: u64,
    largest_cluster: u32,
    size_counts: [u32; 3],
    column_counts: [u32; 3],
    n_target: u32,
}

impl StaveAccumulator {
    pub fn add(&mut self, chip: &ChipStats) {
        self.chip_count += 1;
        self.cluster_count += chip.cluster_count;
        self.total_pixels += chip.total_pixels;
        self.largest_cluster = self.largest_cluster.max(chip.largest_cluster);
        for i in 0..3 {
            self.size_counts[i] += chip.size_counts[i];
            self.column_counts[i] += chip.column_counts[i];
        }
        self.n_target += chip.n_target;
    }

    pub fn finish(
        &self,
        timestamp: Timestamp,
        stave: u32,
        azimuth: f64,
        dead_zone: bool,
    ) -> StaveRecord {
        let mean_pixels = if self.cluster_count == 0 {
            0.0
        } else {
            self.total_pixels as f64 / f64::from(self.cluster_count)
        };
        StaveRecord {
            timestamp,
            stave,
            azimuth,
            dead_zone,
            chip_count: self.chip_count,
            cluster_count: self.cluster_count,
            total_pixels: self.total_pixels,
            mean_pixels,
            largest_cluster: self.largest_cluster,
            size_counts: self.size_counts,
            column_counts: self.column_counts,
            n_target: self.n_target,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
