//! Chunk data acquisition module
//!
//! Handles ingestion of raw chunk files and resolution of compact cluster
//! shapes against the topology dictionary.

pub mod chunk_file;
pub mod pattern;

pub use chunk_file::{load_chunk, load_dictionary, LoadError, RawChunk, RawCluster, RawFrame};
pub use pattern::{
    encode_inline, ClusterShape, PatternStream, ShapeDictionary, ShapeEntry, ShapeError,
    INVALID_PATTERN_ID,
};
