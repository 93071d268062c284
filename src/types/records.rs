//! Output records handed to the persistence side.
//!
//! All records are plain data: the processor builds them, a
//! [`RecordSink`](crate::pipeline::RecordSink) decides where they go.

use super::timestamp::Timestamp;
use crate::tagging::{NearestTags, TagMask};
use serde::{Deserialize, Serialize};

/// Cluster statistics of one chip in one frame.
///
/// `cluster_count` always equals the number of contributing clusters and
/// `total_pixels` their pixel sum.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChipStats {
    pub cluster_count: u32,
    pub total_pixels: u64,
    pub mean_pixels: f64,
    /// Population standard deviation of the pixel counts.
    pub stdev_pixels: f64,
    /// Pixel count of the largest cluster.
    pub largest_cluster: u32,
    /// Mean pixel count of the `top_n` largest clusters.
    pub top_n_mean: f64,
    /// Clusters with at least `pixel_thresholds[i]` pixels.
    pub size_counts: [u32; 3],
    /// Clusters spanning at least `column_thresholds[i]` columns.
    pub column_counts: [u32; 3],
    /// Clusters passing the shape-anomaly predicate.
    pub n_target: u32,
}

/// One chip in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipRecord {
    pub timestamp: Timestamp,
    pub chip: u32,
    pub layer: u32,
    pub stave_in_layer: u32,
    pub azimuth: f64,
    pub dead_zone: bool,
    pub tag_mask: TagMask,
    pub nearest_a: NearestTags,
    pub nearest_c: NearestTags,
    #[serde(flatten)]
    pub stats: ChipStats,
    /// Chip absent from the temporally next frame; `None` for the newest frame.
    pub silent_next: Option<bool>,
    /// Chip absent from the frame two steps later; `None` for the two newest frames.
    pub silent_next2: Option<bool>,
}

/// One stave in one frame, aggregated from its chips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaveRecord {
    pub timestamp: Timestamp,
    pub stave: u32,
    pub azimuth: f64,
    pub dead_zone: bool,
    pub chip_count: u32,
    pub cluster_count: u32,
    pub total_pixels: u64,
    pub mean_pixels: f64,
    pub largest_cluster: u32,
    pub size_counts: [u32; 3],
    pub column_counts: [u32; 3],
    pub n_target: u32,
}

/// Frame-level summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub timestamp: Timestamp,
    /// Strobe window index inside the cycle.
    pub window: u16,
    pub tag_mask: TagMask,
    pub nearest_a: NearestTags,
    pub nearest_c: NearestTags,
    pub any_anomaly: bool,
    pub dead_zone_anomaly: bool,
    /// Clusters inside the region of interest.
    pub n_clusters: u32,
    pub n_chips: u32,
    pub n_chips_dead_zone: u32,
    /// Dead-zone chips lit in the temporally next frame.
    pub n_dead_zone_chips_next: Option<u32>,
}

/// Scalar per-chunk totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkCounters {
    pub chunks: u64,
    pub frames: u64,
    pub pulses_seen_a: u64,
    pub pulses_seen_c: u64,
    pub tags_a: u64,
    pub tags_c: u64,
    pub duplicate_tags_a: u64,
    pub duplicate_tags_c: u64,
    pub tagged_frames_a: u64,
    pub tagged_frames_c: u64,
    pub tagged_frames_any: u64,
    pub clusters_outside_roi: u64,
    pub chip_records: u64,
    pub stave_records: u64,
    pub any_anomaly: u64,
    pub dead_zone_anomaly: u64,
    pub any_anomaly_tagged: u64,
    pub dead_zone_anomaly_tagged: u64,
}

impl ChunkCounters {
    /// Add another chunk's counters to these.
    pub fn absorb(&mut self, other: &Self) {
        self.chunks += other.chunks;
        self.frames += other.frames;
        self.pulses_seen_a += other.pulses_seen_a;
        self.pulses_seen_c += other.pulses_seen_c;
        self.tags_a += other.tags_a;
        self.tags_c += other.tags_c;
        self.duplicate_tags_a += other.duplicate_tags_a;
        self.duplicate_tags_c += other.duplicate_tags_c;
        self.tagged_frames_a += other.tagged_frames_a;
        self.tagged_frames_c += other.tagged_frames_c;
        self.tagged_frames_any += other.tagged_frames_any;
        self.clusters_outside_roi += other.clusters_outside_roi;
        self.chip_records += other.chip_records;
        self.stave_records += other.stave_records;
        self.any_anomaly += other.any_anomaly;
        self.dead_zone_anomaly += other.dead_zone_anomaly;
        self.any_anomaly_tagged += other.any_anomaly_tagged;
        self.dead_zone_anomaly_tagged += other.dead_zone_anomaly_tagged;
    }
}
