//! Study Configuration Module
//!
//! Provides the per-run configuration loaded from TOML files, replacing all
//! hardcoded calibration constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `ITS_BKG_CONFIG` environment variable (path to TOML file)
//! 2. `study_config.toml` in the current working directory
//! 3. Built-in defaults (the reference analysis values)
//!
//! ## Usage
//!
//! The config is passed explicitly to the processor; there is no global:
//!
//! ```ignore
//! let config = StudyConfig::load();
//! let processor = ChunkProcessor::new(&config)?;
//! ```

mod study_config;
pub mod defaults;
pub mod validation;

pub use study_config::*;
