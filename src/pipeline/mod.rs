//! Frame Aggregation & Classification Pipeline
//!
//! ```text
//! ChunkInput
//!   │
//!   ├─ 1. Tag index build (per side, acceptance window)
//!   ├─ 2. Strobe length from the frame count
//!   ├─ 3. Frame loop, newest first
//!   │      ├─ tag mask + nearest tags
//!   │      ├─ chip statistics, anomaly flags
//!   │      ├─ trailing presence (silent next / next-but-one)
//!   │      └─ stave aggregation
//!   └─ 4. ChunkOutput ──► RecordSink
//! ```
//!
//! A chunk either completes or fails as a whole; only completed chunks reach
//! the sink.

mod aggregation;
mod error;
mod parallel;
mod presence;
mod processor;
mod sink;
mod strobe;

pub use aggregation::{chip_stats, StaveAccumulator};
pub use error::{StudyError, StudyWarning};
pub use parallel::{process_chunks_parallel, process_in_batches, RunTotals};
pub use presence::PresenceTracker;
pub use processor::{ChunkOutput, ChunkProcessor, ChunkSummary, FrameOutput};
pub use sink::{CollectingSink, JsonLinesSink, RecordSink, SinkError};
pub use strobe::{derive_strobe_length, StrobeDerivation};
