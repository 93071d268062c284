//! Study Configuration - every calibration constant as an operator-tunable TOML value
//!
//! Each struct implements `Default` with the values used in the 2024 pp
//! analysis, so a missing or empty file reproduces the reference behaviour.
//! The acceptance window and the anomaly cuts are detector-calibration
//! dependent and are expected to change between revisions.

use crate::topology::{LayerSpec, TopologyTable, ITS_LAYERS};
use crate::types::CYCLE_LENGTH;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "ITS_BKG_CONFIG";

/// Config file picked up from the working directory.
pub const LOCAL_CONFIG_FILE: &str = "study_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one study run.
///
/// Load with `StudyConfig::load()` which searches:
/// 1. `$ITS_BKG_CONFIG` env var
/// 2. `./study_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Run identification
    #[serde(default)]
    pub study: StudyInfo,

    /// Shape-anomaly predicate
    #[serde(default)]
    pub anomaly: AnomalyConfig,

    /// Background tagging
    #[serde(default)]
    pub tagging: TaggingConfig,

    /// Strobe length derivation
    #[serde(default)]
    pub strobe: StrobeConfig,

    /// Detector geometry and region of interest
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Cluster size binning
    #[serde(default)]
    pub cluster_size: ClusterSizeConfig,
}

impl StudyConfig {
    /// Load configuration using the standard search order:
    /// 1. `$ITS_BKG_CONFIG` environment variable
    /// 2. `./study_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), study = %config.study.name, "Loaded study config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(study = %config.study.name, "Loaded study config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;

        let (_, range_warnings) = super::validation::validate_physical_ranges(&config);
        for w in range_warnings {
            warn!("{}", w);
        }
        Ok(config)
    }

    /// Serialize to a pretty-printed TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Saved study config");
        Ok(())
    }

    /// Validate structural consistency. Returns all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, _) = super::validation::validate_physical_ranges(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Immutable topology table built from `[geometry]`.
    pub fn topology(&self) -> TopologyTable {
        TopologyTable::new(
            self.geometry.layers.clone(),
            (self.geometry.dead_zone_min, self.geometry.dead_zone_max),
        )
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Study Info
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyInfo {
    #[serde(default = "default_study_name")]
    pub name: String,
}

fn default_study_name() -> String {
    "its-zdc-anomaly".to_string()
}

impl Default for StudyInfo {
    fn default() -> Self {
        Self {
            name: default_study_name(),
        }
    }
}

// ============================================================================
// Anomaly Predicate
// ============================================================================

/// A cluster is anomalous when it is very wide in columns and thin in rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Column span must be strictly above this.
    #[serde(default = "default_column_span_threshold")]
    pub column_span_threshold: u32,
    /// Row span must be strictly below this (when the row cut is enabled).
    #[serde(default = "default_row_span_threshold")]
    pub row_span_threshold: u32,
    /// Earlier calibration revisions cut on column span only.
    #[serde(default = "default_true")]
    pub use_row_span_cut: bool,
}

fn default_column_span_threshold() -> u32 {
    defaults::ANOMALY_COLUMN_SPAN_THRESHOLD
}
fn default_row_span_threshold() -> u32 {
    defaults::ANOMALY_ROW_SPAN_THRESHOLD
}
const fn default_true() -> bool {
    true
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            column_span_threshold: default_column_span_threshold(),
            row_span_threshold: default_row_span_threshold(),
            use_row_span_cut: true,
        }
    }
}

impl AnomalyConfig {
    pub fn is_anomalous(&self, column_span: u32, row_span: u32) -> bool {
        column_span > self.column_span_threshold
            && (!self.use_row_span_cut || row_span < self.row_span_threshold)
    }
}

// ============================================================================
// Tagging
// ============================================================================

/// Background tagging: TDC acceptance window plus diagnostics binning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// Lower edge of the calibrated-value acceptance window (ns, inclusive).
    #[serde(default = "default_acceptance_min")]
    pub acceptance_min: f64,
    /// Upper edge of the calibrated-value acceptance window (ns, inclusive).
    #[serde(default = "default_acceptance_max")]
    pub acceptance_max: f64,
    #[serde(default = "default_value_histogram_bins")]
    pub value_histogram_bins: usize,
    #[serde(default = "default_value_histogram_low")]
    pub value_histogram_low: f64,
    #[serde(default = "default_value_histogram_high")]
    pub value_histogram_high: f64,
}

fn default_acceptance_min() -> f64 {
    defaults::ACCEPTANCE_WINDOW.0
}
fn default_acceptance_max() -> f64 {
    defaults::ACCEPTANCE_WINDOW.1
}
fn default_value_histogram_bins() -> usize {
    defaults::VALUE_HISTOGRAM_BINS
}
fn default_value_histogram_low() -> f64 {
    defaults::VALUE_HISTOGRAM_RANGE.0
}
fn default_value_histogram_high() -> f64 {
    defaults::VALUE_HISTOGRAM_RANGE.1
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            acceptance_min: default_acceptance_min(),
            acceptance_max: default_acceptance_max(),
            value_histogram_bins: default_value_histogram_bins(),
            value_histogram_low: default_value_histogram_low(),
            value_histogram_high: default_value_histogram_high(),
        }
    }
}

// ============================================================================
// Strobe
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrobeConfig {
    /// Strobe length used when the chunk's frame count has no exact layout.
    #[serde(default = "default_fallback_length")]
    pub fallback_length: u16,
    /// Cycles spanned by one chunk.
    #[serde(default = "default_cycles_per_chunk")]
    pub cycles_per_chunk: u32,
}

fn default_fallback_length() -> u16 {
    defaults::STROBE_FALLBACK_LENGTH
}
fn default_cycles_per_chunk() -> u32 {
    defaults::CYCLES_PER_CHUNK
}

impl Default for StrobeConfig {
    fn default() -> Self {
        Self {
            fallback_length: default_fallback_length(),
            cycles_per_chunk: default_cycles_per_chunk(),
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Chips grouped into one stave record.
    #[serde(default = "default_chips_per_stave")]
    pub chips_per_stave: u32,
    /// Clusters on chips at or above this index are ignored.
    #[serde(default = "default_roi_chip_bound")]
    pub roi_chip_bound: u32,
    /// Dead-zone sector lower edge (rad, exclusive).
    #[serde(default = "default_dead_zone_min")]
    pub dead_zone_min: f64,
    /// Dead-zone sector upper edge (rad, exclusive).
    #[serde(default = "default_dead_zone_max")]
    pub dead_zone_max: f64,
    /// Per-layer stave layout, innermost first.
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerSpec>,
}

fn default_chips_per_stave() -> u32 {
    defaults::CHIPS_PER_STAVE
}
fn default_roi_chip_bound() -> u32 {
    defaults::ROI_CHIP_BOUND
}
fn default_dead_zone_min() -> f64 {
    FRAC_PI_2
}
fn default_dead_zone_max() -> f64 {
    PI
}
fn default_layers() -> Vec<LayerSpec> {
    ITS_LAYERS.to_vec()
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            chips_per_stave: default_chips_per_stave(),
            roi_chip_bound: default_roi_chip_bound(),
            dead_zone_min: default_dead_zone_min(),
            dead_zone_max: default_dead_zone_max(),
            layers: default_layers(),
        }
    }
}

// ============================================================================
// Cluster Size Binning
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSizeConfig {
    /// Clusters with at least this many pixels are counted (ascending).
    #[serde(default = "default_pixel_thresholds")]
    pub pixel_thresholds: [u32; 3],
    /// Clusters spanning at least this many columns are counted (ascending).
    #[serde(default = "default_column_thresholds")]
    pub column_thresholds: [u32; 3],
    /// Number of largest clusters averaged into `top_n_mean`.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_pixel_thresholds() -> [u32; 3] {
    defaults::PIXEL_THRESHOLDS
}
fn default_column_thresholds() -> [u32; 3] {
    defaults::COLUMN_THRESHOLDS
}
fn default_top_n() -> usize {
    defaults::TOP_N_CLUSTERS
}

impl Default for ClusterSizeConfig {
    fn default() -> Self {
        Self {
            pixel_thresholds: default_pixel_thresholds(),
            column_thresholds: default_column_thresholds(),
            top_n: default_top_n(),
        }
    }
}

/// Largest legal azimuth bound.
pub(super) const AZIMUTH_MAX: f64 = TAU;

/// Largest legal strobe length.
pub(super) const STROBE_MAX: u16 = CYCLE_LENGTH;

// ============================================================================
// Tests
// ============================================================================
