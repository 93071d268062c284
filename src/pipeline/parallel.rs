//! Parallel Chunk Driver
//!
//! Chunks are independent: each one builds its own tag index, presence
//! vectors and counters inside [`ChunkProcessor::process`]. The processor and
//! its topology table are immutable, so one instance is shared by reference
//! across the rayon pool.
//!
//! [`process_in_batches`] bounds memory for long runs: at most one batch of
//! inputs and outputs is alive at a time, and a batch is fully handed on
//! before the next one is loaded.

use super::processor::{ChunkOutput, ChunkProcessor, ChunkSummary};
use crate::tagging::TagDiagnostics;
use crate::types::{ChunkCounters, ChunkInput};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Process `chunks` on the rayon pool. Results keep the input order.
pub fn process_chunks_parallel(processor: &ChunkProcessor, chunks: &[ChunkInput]) -> Vec<ChunkOutput> {
    chunks.par_iter().map(|chunk| processor.process(chunk)).collect()
}

/// Load and process `sources` in batches of `batch_size` on the rayon pool.
///
/// Each batch is loaded and processed in parallel, then every result is passed
/// to `handle` in input order before the next batch is loaded. A load error is
/// handed on as-is; an error from `handle` stops the run.
pub fn process_in_batches<S, LE, E>(
    processor: &ChunkProcessor,
    sources: &[S],
    batch_size: usize,
    load: impl Fn(&S) -> Result<ChunkInput, LE> + Sync,
    mut handle: impl FnMut(&S, Result<ChunkOutput, LE>) -> Result<(), E>,
) -> Result<(), E>
where
    S: Sync,
    LE: Send,
{
    for batch in sources.chunks(batch_size.max(1)) {
        let results: Vec<Result<ChunkOutput, LE>> = batch
            .par_iter()
            .map(|source| load(source).map(|input| processor.process(&input)))
            .collect();
        for (source, result) in batch.iter().zip(results) {
            handle(source, result)?;
        }
    }
    Ok(())
}

/// Run-level totals folded from chunk summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub counters: ChunkCounters,
    pub warnings: u64,
    /// Chunks per derived strobe length.
    pub strobe_lengths: BTreeMap<u16, u64>,
    pub target_tally: BTreeMap<u32, u64>,
    pub diagnostics: Option<TagDiagnostics>,
}

impl RunTotals {
    pub fn absorb(&mut self, summary: &ChunkSummary) {
        self.counters.absorb(&summary.counters);
        self.warnings += summary.warnings.len() as u64;
        *self.strobe_lengths.entry(summary.strobe_length).or_default() += 1;
        for (&chip, &n) in &summary.target_tally {
            *self.target_tally.entry(chip).or_default() += u64::from(n);
        }
        match &mut self.diagnostics {
            Some(d) => d.merge(&summary.diagnostics),
            None => self.diagnostics = Some(summary.diagnostics.clone()),
        }
    }
}
