//! Shared data structures for the background study
//!
//! - `timestamp`: cyclic timestamps and signed distance
//! - `input`: background pulses, clusters and frames of one chunk
//! - `records`: chip, stave and frame records plus chunk counters

mod input;
mod records;
mod timestamp;

pub use input::*;
pub use records::*;
pub use timestamp::*;
