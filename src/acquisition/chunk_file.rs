//! Raw chunk records and their resolution into processor input.
//!
//! A raw chunk is what the reconstruction hands over: background pulses,
//! frames of compact clusters (chip + pattern id) and the inline pattern
//! stream. Resolution walks the clusters in frame order, exactly once, and
//! fails the whole chunk on the first unresolvable shape so no frame of a
//! broken chunk is ever emitted.

use super::pattern::{PatternStream, ShapeDictionary, ShapeError};
use crate::types::{BackgroundPulse, ChunkInput, ClusterRecord, Frame, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// A compact cluster before shape resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCluster {
    pub chip: u32,
    pub pattern_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub clusters: Vec<RawCluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChunk {
    #[serde(default)]
    pub pulses: Vec<BackgroundPulse>,
    #[serde(default)]
    pub frames: Vec<RawFrame>,
    /// Inline patterns for every cluster that needs one, in cluster order.
    #[serde(default)]
    pub patterns: Vec<u8>,
}

impl RawChunk {
    /// Resolve every cluster's shape against `dict` and the inline stream.
    pub fn resolve(self, dict: &ShapeDictionary) -> Result<ChunkInput, ShapeError> {
        let mut stream = PatternStream::new(&self.patterns);
        let mut frames = Vec::with_capacity(self.frames.len());
        let mut inline = 0usize;

        for raw in self.frames {
            let mut clusters = Vec::with_capacity(raw.clusters.len());
            for c in &raw.clusters {
                let shape = if dict.needs_inline(c.pattern_id) {
                    inline += 1;
                    stream.acquire()?
                } else {
                    dict.get(c.pattern_id)
                        .map(|e| e.shape)
                        .ok_or(ShapeError::MissingShapeDictionaryEntry {
                            pattern_id: c.pattern_id,
                            chip: c.chip,
                        })?
                };
                clusters.push(ClusterRecord {
                    chip: c.chip,
                    pixel_count: shape.pixel_count,
                    column_span: shape.column_span,
                    row_span: shape.row_span,
                });
            }
            frames.push(Frame {
                timestamp: raw.timestamp,
                clusters,
            });
        }
        stream.finish()?;

        debug!(frames = frames.len(), inline, "Resolved cluster shapes");
        Ok(ChunkInput {
            pulses: self.pulses,
            frames,
        })
    }
}

// ============================================================================
// File Loading
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Shape resolution failed for {path}: {source}")]
    Shape { path: PathBuf, source: ShapeError },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_dictionary(path: &Path) -> Result<ShapeDictionary, LoadError> {
    read_json(path)
}

/// Load a chunk file. With a dictionary the file holds a [`RawChunk`];
/// without one it holds an already resolved [`ChunkInput`].
pub fn load_chunk(path: &Path, dict: Option<&ShapeDictionary>) -> Result<ChunkInput, LoadError> {
    match dict {
        Some(dict) => read_json::<RawChunk>(path)?
            .resolve(dict)
            .map_err(|source| LoadError::Shape {
                path: path.to_path_buf(),
                source,
            }),
        None => read_json(path),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::pattern::{encode_inline, ClusterShape, ShapeEntry, INVALID_PATTERN_ID};
    use std::io::Write;

    fn dict() -> ShapeDictionary {
        let mut d = ShapeDictionary::default();
        d.insert(ShapeEntry {
            pattern_id: 1,
            shape: ClusterShape {
                pixel_count: 4,
                column_span: 2,
                row_span: 2,
            },
            is_group: false,
        });
        d.insert(ShapeEntry {
            pattern_id: 50,
            shape: ClusterShape {
                pixel_count: 0,
                column_span: 0,
                row_span: 0,
            },
            is_group: true,
        });
        d
    }

    fn raw_frame(cycle: u64, slot: u16, clusters: &[(u32, u16)]) -> RawFrame {
        RawFrame {
            timestamp: Timestamp::new(cycle, slot).unwrap(),
            clusters: clusters
                .iter()
                .map(|&(chip, pattern_id)| RawCluster { chip, pattern_id })
                .collect(),
        }
    }

    #[test]
    fn test_resolve_mixes_dictionary_and_inline() {
        let mut patterns = encode_inline(3, 140, 200);
        patterns.extend(encode_inline(1, 1, 1));
        let chunk = RawChunk {
            pulses: Vec::new(),
            frames: vec![
                raw_frame(1, 0, &[(5, 1), (6, INVALID_PATTERN_ID)]),
                raw_frame(1, 594, &[(7, 50)]),
            ],
            patterns,
        };
        let input = chunk.resolve(&dict()).unwrap();
        assert_eq!(input.frames.len(), 2);
        assert_eq!(input.frames[0].clusters[0].pixel_count, 4);
        assert_eq!(input.frames[0].clusters[1].column_span, 140);
        assert_eq!(input.frames[0].clusters[1].pixel_count, 200);
        assert_eq!(input.frames[1].clusters[0].pixel_count, 1);
    }

    #[test]
    fn test_missing_entry_fails_chunk() {
        let chunk = RawChunk {
            frames: vec![raw_frame(1, 0, &[(5, 1)]), raw_frame(1, 594, &[(9, 2)])],
            ..RawChunk::default()
        };
        let err = chunk.resolve(&dict()).unwrap_err();
        assert_eq!(
            err,
            ShapeError::MissingShapeDictionaryEntry { pattern_id: 2, chip: 9 }
        );
    }

    #[test]
    fn test_missing_inline_pattern_fails_chunk() {
        let chunk = RawChunk {
            frames: vec![raw_frame(1, 0, &[(5, INVALID_PATTERN_ID)])],
            ..RawChunk::default()
        };
        assert!(matches!(
            chunk.resolve(&dict()),
            Err(ShapeError::TruncatedPattern { .. })
        ));
    }

    #[test]
    fn test_load_resolved_chunk_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "pulses": [{{"timestamp": {{"cycle": 3, "slot": 10}}, "side": "A", "calibrated_value": 7.5}}],
                "frames": [{{"timestamp": {{"cycle": 3, "slot": 0}},
                             "clusters": [{{"chip": 1, "pixel_count": 5, "column_span": 2, "row_span": 3}}]}}]
            }}"#
        )
        .unwrap();
        let input = load_chunk(file.path(), None).unwrap();
        assert_eq!(input.pulses.len(), 1);
        assert_eq!(input.frames[0].clusters[0].pixel_count, 5);
    }

    #[test]
    fn test_load_rejects_invalid_slot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"frames": [{{"timestamp": {{"cycle": 3, "slot": 3564}}}}]}}"#
        )
        .unwrap();
        assert!(matches!(
            load_chunk(file.path(), None),
            Err(LoadError::Json { .. })
        ));
    }
}
