//! Fixed-binning 1D histogram for tag diagnostics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1D {
    pub low: f64,
    pub high: f64,
    pub bins: Vec<u64>,
    pub underflow: u64,
    pub overflow: u64,
}

impl Histogram1D {
    /// `n_bins` equal-width bins over `[low, high)`.
    ///
    /// A degenerate range or zero bins yields a histogram that only counts
    /// under/overflow.
    pub fn new(n_bins: usize, low: f64, high: f64) -> Self {
        let n_bins = if high > low { n_bins } else { 0 };
        Self {
            low,
            high,
            bins: vec![0; n_bins],
            underflow: 0,
            overflow: 0,
        }
    }

    pub fn fill(&mut self, value: f64) {
        if value.is_nan() || value < self.low {
            self.underflow += 1;
            return;
        }
        if value >= self.high || self.bins.is_empty() {
            self.overflow += 1;
            return;
        }
        let width = (self.high - self.low) / self.bins.len() as f64;
        // value is inside [low, high) here, so the index is non-negative.
        let idx = ((value - self.low) / width) as usize;
        let last = self.bins.len() - 1;
        self.bins[idx.min(last)] += 1;
    }

    /// Entries inside the binned range.
    pub fn entries(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Merge another histogram with identical binning into this one.
    pub fn merge(&mut self, other: &Self) {
        if self.bins.len() != other.bins.len() || self.low != other.low || self.high != other.high {
            tracing::warn!(
                lhs_bins = self.bins.len(),
                rhs_bins = other.bins.len(),
                "Refusing to merge histograms with different binning"
            );
            return;
        }
        for (a, b) in self.bins.iter_mut().zip(&other.bins) {
            *a += b;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
    }
}
