//! Chunk Processor
//!
//! Runs one chunk through the study:
//!
//! ```text
//! pulses ──► TagIndexBuilder ──► SideTags (read-only)
//!                                     │
//! frames ──► sort, newest first ──► frame loop ──► ChunkOutput ──► RecordSink
//!                                     │
//!                            PresenceTracker (trailing state)
//! ```
//!
//! The whole chunk is computed before anything reaches the sink, so a chunk
//! that fails is never partially emitted. All state lives on the stack of
//! [`ChunkProcessor::process`]; the processor itself only holds the immutable
//! config and topology and can be shared between worker threads.

use super::aggregation::{chip_stats, StaveAccumulator};
use super::error::{StudyError, StudyWarning};
use super::presence::PresenceTracker;
use super::sink::RecordSink;
use super::strobe::derive_strobe_length;
use crate::acquisition::{RawChunk, ShapeDictionary};
use crate::config::StudyConfig;
use crate::tagging::{SideTags, TagDiagnostics, TagIndexBuilder};
use crate::topology::TopologyTable;
use crate::types::{
    ChipRecord, ChunkCounters, ChunkInput, ClusterRecord, DetectorSide, Frame, FrameRecord,
    StaveRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// ============================================================================
// Output
// ============================================================================

/// Chunk-level results handed to the sink after the chunk's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub counters: ChunkCounters,
    pub strobe_length: u16,
    pub warnings: Vec<StudyWarning>,
    /// Anomalous clusters per chip, summed over the chunk.
    pub target_tally: BTreeMap<u32, u32>,
    pub diagnostics: TagDiagnostics,
}

/// Records of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub frame: FrameRecord,
    pub chips: Vec<ChipRecord>,
    pub staves: Vec<StaveRecord>,
}

/// Everything one chunk produced, frames in processing order (newest first).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutput {
    pub frames: Vec<FrameOutput>,
    pub summary: ChunkSummary,
}

impl ChunkOutput {
    /// Hand every record to `sink`: per frame its chips, staves, then the
    /// frame record; the summary last.
    pub fn emit(&self, sink: &mut dyn RecordSink) -> Result<(), StudyError> {
        for out in &self.frames {
            for chip in &out.chips {
                sink.chip(chip)?;
            }
            for stave in &out.staves {
                sink.stave(stave)?;
            }
            sink.frame(&out.frame)?;
        }
        sink.summary(&self.summary)?;
        sink.flush()?;
        Ok(())
    }
}

// ============================================================================
// Processor
// ============================================================================

/// Per-chunk mutable state of the frame loop.
struct FrameLoop<'a> {
    tags: &'a SideTags,
    strobe_length: u16,
    presence: PresenceTracker,
    counters: ChunkCounters,
    target_tally: BTreeMap<u32, u32>,
}

pub struct ChunkProcessor {
    config: StudyConfig,
    topology: TopologyTable,
}

impl ChunkProcessor {
    /// Build a processor for `config`. Configs that fail
    /// [`StudyConfig::validate`] are rejected here, since the frame loop
    /// divides by the stave size and the strobe length.
    pub fn new(config: &StudyConfig) -> Result<Self, StudyError> {
        let topology = config.topology();
        if topology.layers().is_empty() {
            return Err(StudyError::EmptyTopology);
        }
        let roi_chip_bound = config.geometry.roi_chip_bound;
        if roi_chip_bound > topology.total_chips() {
            return Err(StudyError::RegionOutsideTopology {
                roi_chip_bound,
                total_chips: topology.total_chips(),
            });
        }
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            topology,
        })
    }

    pub const fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub const fn topology(&self) -> &TopologyTable {
        &self.topology
    }

    /// Resolve a raw chunk's cluster shapes, then process it.
    pub fn process_raw(&self, raw: RawChunk, dict: &ShapeDictionary) -> Result<ChunkOutput, StudyError> {
        let input = raw.resolve(dict)?;
        Ok(self.process(&input))
    }

    /// Process a chunk and hand its records to `sink`.
    pub fn run(&self, input: &ChunkInput, sink: &mut dyn RecordSink) -> Result<ChunkSummary, StudyError> {
        let output = self.process(input);
        output.emit(sink)?;
        Ok(output.summary)
    }

    /// Process one chunk. Pure: nothing is shared with other chunks.
    pub fn process(&self, input: &ChunkInput) -> ChunkOutput {
        let mut warnings = Vec::new();

        // Tag index
        let (tags, diagnostics) = TagIndexBuilder::build(&self.config.tagging, &input.pulses);
        for side in DetectorSide::ALL {
            warnings.extend(diagnostics.side(side).duplicates.iter().map(|&timestamp| {
                StudyWarning::DuplicateTag { side, timestamp }
            }));
        }

        // Strobe
        let strobe = derive_strobe_length(input.frames.len(), &self.config.strobe);
        if let Some(w) = strobe.warning {
            warn!("{}", w);
            warnings.push(w);
        }

        let mut order: Vec<&Frame> = input.frames.iter().collect();
        order.sort_by_key(|f| f.timestamp);
        if let Some(first) = order.first() {
            info!(
                first = %first.timestamp,
                frames = order.len(),
                strobe_length = strobe.length,
                "Processing chunk"
            );
        }

        let mut state = FrameLoop {
            tags: &tags,
            strobe_length: strobe.length,
            presence: PresenceTracker::new(self.config.geometry.roi_chip_bound as usize),
            counters: ChunkCounters {
                chunks: 1,
                ..ChunkCounters::default()
            },
            target_tally: BTreeMap::new(),
        };

        let frames: Vec<FrameOutput> = order
            .iter()
            .rev()
            .map(|frame| {
                let out = self.process_frame(frame, &mut state);
                state.presence.advance();
                out
            })
            .collect();

        let mut counters = state.counters;
        counters.pulses_seen_a = diagnostics.side_a.pulses_seen;
        counters.pulses_seen_c = diagnostics.side_c.pulses_seen;
        counters.tags_a = tags.side(DetectorSide::A).len() as u64;
        counters.tags_c = tags.side(DetectorSide::C).len() as u64;
        counters.duplicate_tags_a = diagnostics.side_a.duplicates.len() as u64;
        counters.duplicate_tags_c = diagnostics.side_c.duplicates.len() as u64;

        info!(
            frames = counters.frames,
            tagged_a = counters.tagged_frames_a,
            tagged_c = counters.tagged_frames_c,
            any_anomaly = counters.any_anomaly,
            dead_zone_anomaly = counters.dead_zone_anomaly,
            warnings = warnings.len(),
            "Chunk processed"
        );

        ChunkOutput {
            frames,
            summary: ChunkSummary {
                counters,
                strobe_length: strobe.length,
                warnings,
                target_tally: state.target_tally,
                diagnostics,
            },
        }
    }

    fn process_frame(&self, frame: &Frame, state: &mut FrameLoop<'_>) -> FrameOutput {
        let ts = frame.timestamp;
        let geometry = &self.config.geometry;

        let tag_mask = state.tags.tag_mask(ts, state.strobe_length);
        let nearest_a = state.tags.nearest(DetectorSide::A, ts);
        let nearest_c = state.tags.nearest(DetectorSide::C, ts);

        let counters = &mut state.counters;
        counters.frames += 1;
        counters.tagged_frames_a += u64::from(tag_mask.has(DetectorSide::A));
        counters.tagged_frames_c += u64::from(tag_mask.has(DetectorSide::C));
        counters.tagged_frames_any += u64::from(tag_mask.is_tagged());
        if tag_mask.is_tagged() {
            debug!(
                timestamp = %ts,
                mask = tag_mask.bits(),
                a = ?nearest_a.sentinel_pair(),
                c = ?nearest_c.sentinel_pair(),
                "Tagged frame"
            );
        }

        // Group by chip, region of interest only
        let mut by_chip: BTreeMap<u32, Vec<ClusterRecord>> = BTreeMap::new();
        let mut n_clusters = 0u32;
        for cluster in &frame.clusters {
            if cluster.chip >= geometry.roi_chip_bound {
                counters.clusters_outside_roi += 1;
                continue;
            }
            n_clusters += 1;
            by_chip.entry(cluster.chip).or_default().push(*cluster);
        }

        let mut any_anomaly = false;
        let mut dead_zone_anomaly = false;
        let mut n_chips = 0u32;
        let mut n_chips_dead_zone = 0u32;
        let mut chips = Vec::with_capacity(by_chip.len());
        let mut staves: BTreeMap<u32, StaveAccumulator> = BTreeMap::new();

        for (chip, clusters) in &by_chip {
            let chip = *chip;
            // roi_chip_bound <= total_chips is checked in new()
            let Some(entry) = self.topology.locate(chip) else {
                continue;
            };
            state.presence.mark(chip);

            let stats = chip_stats(clusters, &self.config.cluster_size, &self.config.anomaly);
            let dead_zone = self.topology.is_dead_zone_azimuth(entry.azimuth);

            n_chips += 1;
            n_chips_dead_zone += u32::from(dead_zone);

            if stats.n_target > 0 {
                *state.target_tally.entry(chip).or_default() += stats.n_target;
                if !any_anomaly {
                    any_anomaly = true;
                    counters.any_anomaly += 1;
                    counters.any_anomaly_tagged += u64::from(tag_mask.is_tagged());
                }
                if dead_zone && !dead_zone_anomaly {
                    dead_zone_anomaly = true;
                    counters.dead_zone_anomaly += 1;
                    counters.dead_zone_anomaly_tagged += u64::from(tag_mask.is_tagged());
                }
            }

            staves
                .entry(chip / geometry.chips_per_stave)
                .or_default()
                .add(&stats);

            chips.push(ChipRecord {
                timestamp: ts,
                chip,
                layer: entry.layer,
                stave_in_layer: entry.stave_in_layer,
                azimuth: entry.azimuth,
                dead_zone,
                tag_mask,
                nearest_a,
                nearest_c,
                stats,
                silent_next: state.presence.silent_next(chip),
                silent_next2: state.presence.silent_next2(chip),
            });
        }

        let staves: Vec<StaveRecord> = staves
            .iter()
            .map(|(&stave, acc)| {
                let azimuth = self
                    .topology
                    .azimuth(stave * geometry.chips_per_stave)
                    .unwrap_or_default();
                acc.finish(ts, stave, azimuth, self.topology.is_dead_zone_azimuth(azimuth))
            })
            .collect();

        counters.chip_records += chips.len() as u64;
        counters.stave_records += staves.len() as u64;

        let n_dead_zone_chips_next = state
            .presence
            .count_next(|chip| self.topology.is_dead_zone_chip(chip));

        FrameOutput {
            frame: FrameRecord {
                timestamp: ts,
                window: ts.window(state.strobe_length),
                tag_mask,
                nearest_a,
                nearest_c,
                any_anomaly,
                dead_zone_anomaly,
                n_clusters,
                n_chips,
                n_chips_dead_zone,
                n_dead_zone_chips_next,
            },
            chips,
            staves,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
