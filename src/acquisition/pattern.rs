//! Cluster Shape Patterns
//!
//! Compact clusters carry a pattern id into a shared topology dictionary. Ids
//! that are invalid, or that the dictionary marks as a group, do not describe
//! a single shape: the concrete pattern for those clusters follows inline in
//! the chunk's pattern byte stream, in cluster order.
//!
//! Inline pattern encoding:
//!
//! ```text
//! [row_span: u8][column_span: u8][bitmap: ceil(row_span * column_span / 8) bytes]
//! ```
//!
//! The pixel count is the number of set bits in the bitmap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Pattern id meaning "shape follows inline".
pub const INVALID_PATTERN_ID: u16 = 0x7FFF;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("Missing shape dictionary entry for pattern id {pattern_id} (chip {chip})")]
    MissingShapeDictionaryEntry { pattern_id: u16, chip: u32 },

    #[error("Pattern stream truncated at byte {offset}: need {needed} more bytes")]
    TruncatedPattern { offset: usize, needed: usize },

    #[error("Pattern stream has {remaining} unconsumed bytes after the last cluster")]
    UnconsumedPatternBytes { remaining: usize },
}

// ============================================================================
// Shapes
// ============================================================================

/// Resolved cluster shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterShape {
    pub pixel_count: u32,
    pub column_span: u32,
    pub row_span: u32,
}

/// One topology dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeEntry {
    pub pattern_id: u16,
    #[serde(flatten)]
    pub shape: ClusterShape,
    /// Group entries stand for a family of shapes; the concrete shape is inline.
    #[serde(default)]
    pub is_group: bool,
}

/// Pattern id → shape lookup shared by every chunk of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ShapeEntry>", into = "Vec<ShapeEntry>")]
pub struct ShapeDictionary {
    entries: HashMap<u16, ShapeEntry>,
}

impl From<Vec<ShapeEntry>> for ShapeDictionary {
    fn from(entries: Vec<ShapeEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.pattern_id, e)).collect(),
        }
    }
}

impl From<ShapeDictionary> for Vec<ShapeEntry> {
    fn from(dict: ShapeDictionary) -> Self {
        let mut entries: Self = dict.entries.into_values().collect();
        entries.sort_by_key(|e| e.pattern_id);
        entries
    }
}

impl ShapeDictionary {
    pub fn insert(&mut self, entry: ShapeEntry) {
        self.entries.insert(entry.pattern_id, entry);
    }

    pub fn get(&self, pattern_id: u16) -> Option<&ShapeEntry> {
        self.entries.get(&pattern_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a cluster with this id takes its shape from the inline stream.
    pub fn needs_inline(&self, pattern_id: u16) -> bool {
        pattern_id == INVALID_PATTERN_ID || self.get(pattern_id).is_some_and(|e| e.is_group)
    }
}

// ============================================================================
// Inline Pattern Stream
// ============================================================================

/// Cursor over a chunk's inline pattern bytes.
pub struct PatternStream<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> PatternStream<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Decode the next inline pattern.
    pub fn acquire(&mut self) -> Result<ClusterShape, ShapeError> {
        let header = self.take(2)?;
        let row_span = u32::from(header[0]);
        let column_span = u32::from(header[1]);
        let n_bytes = (row_span * column_span).div_ceil(8) as usize;
        let bitmap = self.take(n_bytes)?;
        let pixel_count = bitmap.iter().map(|b| b.count_ones()).sum();
        Ok(ClusterShape {
            pixel_count,
            column_span,
            row_span,
        })
    }

    /// Error out if bytes are left after the last cluster.
    pub const fn finish(self) -> Result<(), ShapeError> {
        if self.remaining() == 0 {
            Ok(())
        } else {
            Err(ShapeError::UnconsumedPatternBytes {
                remaining: self.remaining(),
            })
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ShapeError> {
        if self.remaining() < n {
            return Err(ShapeError::TruncatedPattern {
                offset: self.offset,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }
}

/// Encode a shape as an inline pattern with the first `pixel_count` bits set.
///
/// Builds pattern streams for tests and hand-written raw chunks.
pub fn encode_inline(row_span: u8, column_span: u8, pixel_count: u32) -> Vec<u8> {
    let cells = u32::from(row_span) * u32::from(column_span);
    let n_bytes = cells.div_ceil(8) as usize;
    let mut out = Vec::with_capacity(2 + n_bytes);
    out.push(row_span);
    out.push(column_span);
    let mut left = pixel_count.min(cells);
    for _ in 0..n_bytes {
        let bits = left.min(8);
        // bits <= 8
        out.push(((1u16 << bits) - 1) as u8);
        left -= bits;
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pattern_id: u16, pixels: u32, cols: u32, rows: u32, is_group: bool) -> ShapeEntry {
        ShapeEntry {
            pattern_id,
            shape: ClusterShape {
                pixel_count: pixels,
                column_span: cols,
                row_span: rows,
            },
            is_group,
        }
    }

    #[test]
    fn test_acquire_counts_bits() {
        let bytes = [2u8, 3, 0b0010_1101];
        let mut stream = PatternStream::new(&bytes);
        let shape = stream.acquire().unwrap();
        assert_eq!(shape.row_span, 2);
        assert_eq!(shape.column_span, 3);
        assert_eq!(shape.pixel_count, 4);
        assert!(stream.finish().is_ok());
    }

    #[test]
    fn test_truncated_stream() {
        let bytes = [4u8, 4, 0xFF];
        let mut stream = PatternStream::new(&bytes);
        let err = stream.acquire().unwrap_err();
        assert_eq!(err, ShapeError::TruncatedPattern { offset: 2, needed: 1 });
    }

    #[test]
    fn test_leftover_bytes_rejected() {
        let bytes = [1u8, 1, 0x01, 0x00];
        let mut stream = PatternStream::new(&bytes);
        stream.acquire().unwrap();
        assert_eq!(
            stream.finish(),
            Err(ShapeError::UnconsumedPatternBytes { remaining: 1 })
        );
    }

    #[test]
    fn test_encode_inline_round_trips_pixel_count() {
        let bytes = encode_inline(5, 200, 137);
        let mut stream = PatternStream::new(&bytes);
        let shape = stream.acquire().unwrap();
        assert_eq!(shape.pixel_count, 137);
        assert_eq!(shape.column_span, 200);
        assert_eq!(shape.row_span, 5);
    }

    #[test]
    fn test_needs_inline() {
        let mut dict = ShapeDictionary::default();
        dict.insert(entry(1, 4, 2, 2, false));
        dict.insert(entry(2, 0, 0, 0, true));
        assert!(!dict.needs_inline(1));
        assert!(dict.needs_inline(2));
        assert!(dict.needs_inline(INVALID_PATTERN_ID));
        assert!(!dict.needs_inline(3), "unknown ids are looked up, not read inline");
    }

    #[test]
    fn test_dictionary_json_is_a_list() {
        let json = r#"[
            {"pattern_id": 7, "pixel_count": 3, "column_span": 2, "row_span": 2},
            {"pattern_id": 9, "pixel_count": 0, "column_span": 0, "row_span": 0, "is_group": true}
        ]"#;
        let dict: ShapeDictionary = serde_json::from_str(json).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(7).unwrap().shape.pixel_count, 3);
        assert!(dict.get(9).unwrap().is_group);
    }
}
