//! Background Tagging
//!
//! Turns the background detector's calibrated pulses into per-side indices of
//! tagged `(cycle, slot)` pairs and answers the two questions the frame loop
//! asks of them: "is this frame's strobe window tagged?" and "how far away are
//! the nearest tags?".

mod builder;
mod histogram;
mod tag_index;

pub use builder::{SideDiagnostics, SideTags, TagDiagnostics, TagIndexBuilder, TagMask};
pub use histogram::Histogram1D;
pub use tag_index::{BackgroundTagIndex, NearestTags, TagInsert, NO_TAG_AFTER, NO_TAG_BEFORE};
