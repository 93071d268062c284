//! Record Sinks
//!
//! The processor never persists anything itself: finished chunks are handed
//! to a [`RecordSink`]. Two implementations ship with the crate:
//!
//! - [`CollectingSink`]: keeps every record in memory (tests, notebooks)
//! - [`JsonLinesSink`]: one JSON object per line, tagged with a `kind` field

use super::processor::ChunkSummary;
use crate::types::{ChipRecord, FrameRecord, StaveRecord};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Receiver of the records of finished chunks.
pub trait RecordSink {
    fn chip(&mut self, record: &ChipRecord) -> Result<(), SinkError>;

    fn stave(&mut self, record: &StaveRecord) -> Result<(), SinkError>;

    fn frame(&mut self, record: &FrameRecord) -> Result<(), SinkError>;

    /// Called once per chunk, after all of its records.
    fn summary(&mut self, summary: &ChunkSummary) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub chips: Vec<ChipRecord>,
    pub staves: Vec<StaveRecord>,
    pub frames: Vec<FrameRecord>,
    pub summaries: Vec<ChunkSummary>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chip records of `chip`, in emission order.
    pub fn chip_history(&self, chip: u32) -> impl Iterator<Item = &ChipRecord> {
        self.chips.iter().filter(move |r| r.chip == chip)
    }
}

impl RecordSink for CollectingSink {
    fn chip(&mut self, record: &ChipRecord) -> Result<(), SinkError> {
        self.chips.push(record.clone());
        Ok(())
    }

    fn stave(&mut self, record: &StaveRecord) -> Result<(), SinkError> {
        self.staves.push(record.clone());
        Ok(())
    }

    fn frame(&mut self, record: &FrameRecord) -> Result<(), SinkError> {
        self.frames.push(record.clone());
        Ok(())
    }

    fn summary(&mut self, summary: &ChunkSummary) -> Result<(), SinkError> {
        self.summaries.push(summary.clone());
        Ok(())
    }
}

// ============================================================================
// JSON Lines
// ============================================================================

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line<'a> {
    Chip(&'a ChipRecord),
    Stave(&'a StaveRecord),
    Frame(&'a FrameRecord),
    Summary(&'a ChunkSummary),
}

pub struct JsonLinesSink<W: Write> {
    writer: W,
    lines: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    pub const fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &Line<'_>) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn chip(&mut self, record: &ChipRecord) -> Result<(), SinkError> {
        self.write_line(&Line::Chip(record))
    }

    fn stave(&mut self, record: &StaveRecord) -> Result<(), SinkError> {
        self.write_line(&Line::Stave(record))
    }

    fn frame(&mut self, record: &FrameRecord) -> Result<(), SinkError> {
        self.write_line(&Line::Frame(record))
    }

    fn summary(&mut self, summary: &ChunkSummary) -> Result<(), SinkError> {
        self.write_line(&Line::Summary(summary))
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
