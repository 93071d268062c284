//! ITS background study: correlating ITS readout frames with ZDC background tags
//!
//! ## Architecture
//!
//! - **Types**: cyclic `(cycle, slot)` timestamps, inbound chunk records and
//!   the chip/stave/frame records handed to persistence
//! - **Topology**: chip index to layer, stave and azimuth
//! - **Tagging**: per-side background tag indices with nearest-tag search
//! - **Acquisition**: shape dictionary, inline pattern decoding, chunk files
//! - **Pipeline**: per-chunk frame loop, trailing presence state, sinks and
//!   the parallel multi-chunk driver
//! - **Config**: TOML study configuration with validation

pub mod acquisition;
pub mod config;
pub mod pipeline;
pub mod tagging;
pub mod topology;
pub mod types;

pub use config::StudyConfig;
pub use pipeline::{
    process_chunks_parallel, process_in_batches, ChunkOutput, ChunkProcessor, ChunkSummary,
    CollectingSink, JsonLinesSink, RecordSink, RunTotals, StudyError, StudyWarning,
};
pub use tagging::{BackgroundTagIndex, NearestTags, TagMask};
pub use topology::{TopologyEntry, TopologyTable};
pub use types::{
    distance, BackgroundPulse, ChipRecord, ChunkCounters, ChunkInput, ClusterRecord,
    DetectorSide, Frame, FrameRecord, StaveRecord, Timestamp, CYCLE_LENGTH,
};
