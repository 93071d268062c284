//! System-wide default constants.
//!
//! Centralises the calibration numbers of the reference analysis. Grouped by
//! subsystem for easy discovery; every one of them can be overridden from
//! `study_config.toml`.

// ============================================================================
// Anomaly Predicate
// ============================================================================

/// Column span a cluster must exceed to be a shape anomaly.
pub const ANOMALY_COLUMN_SPAN_THRESHOLD: u32 = 127;

/// Row span a shape anomaly must stay below.
pub const ANOMALY_ROW_SPAN_THRESHOLD: u32 = 30;

// ============================================================================
// Background Tagging
// ============================================================================

/// Calibrated TDC acceptance window (ns, inclusive).
///
/// Detector-calibration dependent: an earlier revision used `5.7..8.7`.
pub const ACCEPTANCE_WINDOW: (f64, f64) = (5.0, 11.0);

/// Binning of the calibrated-value diagnostics histogram.
pub const VALUE_HISTOGRAM_BINS: usize = 40;
pub const VALUE_HISTOGRAM_RANGE: (f64, f64) = (-20.0, 20.0);

// ============================================================================
// Strobe
// ============================================================================

/// Strobe length (slots) used when a chunk has no recognised layout.
///
/// 594 slots = 6 readout frames per cycle.
pub const STROBE_FALLBACK_LENGTH: u16 = 594;

/// Cycles per chunk (time frame).
pub const CYCLES_PER_CHUNK: u32 = 32;

// ============================================================================
// Geometry
// ============================================================================

/// Chips per stave in the inner barrel.
pub const CHIPS_PER_STAVE: u32 = 9;

/// First chip outside the region of interest (end of the inner barrel).
pub const ROI_CHIP_BOUND: u32 = 432;

// ============================================================================
// Cluster Size Binning
// ============================================================================

/// Pixel-count thresholds for the large-cluster counters.
pub const PIXEL_THRESHOLDS: [u32; 3] = [20, 100, 150];

/// Column-span thresholds for the wide-cluster counters.
pub const COLUMN_THRESHOLDS: [u32; 3] = [20, 100, 128];

/// Largest clusters averaged per chip.
pub const TOP_N_CLUSTERS: usize = 10;
