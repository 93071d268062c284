//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Unknown keys never break a config.

use super::study_config::{StudyConfig, AZIMUTH_MAX, STROBE_MAX};
use crate::types::CYCLE_LENGTH;
use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `StudyConfig`.
///
/// Maintained by hand to match the struct hierarchy in `study_config.rs`.
/// Entries of `geometry.layers` are arrays of tables and are not walked.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [study]
        "study",
        "study.name",
        // [anomaly]
        "anomaly",
        "anomaly.column_span_threshold",
        "anomaly.row_span_threshold",
        "anomaly.use_row_span_cut",
        // [tagging]
        "tagging",
        "tagging.acceptance_min",
        "tagging.acceptance_max",
        "tagging.value_histogram_bins",
        "tagging.value_histogram_low",
        "tagging.value_histogram_high",
        // [strobe]
        "strobe",
        "strobe.fallback_length",
        "strobe.cycles_per_chunk",
        // [geometry]
        "geometry",
        "geometry.chips_per_stave",
        "geometry.roi_chip_bound",
        "geometry.dead_zone_min",
        "geometry.dead_zone_max",
        "geometry.layers",
        // [cluster_size]
        "cluster_size",
        "cluster_size.pixel_thresholds",
        "cluster_size.column_thresholds",
        "cluster_size.top_n",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate ranges on a parsed `StudyConfig`.
///
/// Returns (errors, warnings): errors are values the pipeline cannot run with;
/// warnings are legal but unusual for the reference detector.
pub fn validate_physical_ranges(config: &StudyConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Acceptance window: finite and ordered
    let t = &config.tagging;
    if !t.acceptance_min.is_finite() || !t.acceptance_max.is_finite() {
        errors.push(format!(
            "tagging.acceptance window must be finite (got {}..{})",
            t.acceptance_min, t.acceptance_max
        ));
    } else if t.acceptance_min > t.acceptance_max {
        errors.push(format!(
            "tagging.acceptance_min ({:.3}) must be <= acceptance_max ({:.3})",
            t.acceptance_min, t.acceptance_max
        ));
    } else if t.acceptance_min < t.value_histogram_low || t.acceptance_max > t.value_histogram_high {
        warnings.push(ValidationWarning {
            field: "tagging.acceptance_min".to_string(),
            message: format!(
                "acceptance window {:.1}..{:.1} extends outside the diagnostics histogram ({:.1}..{:.1})",
                t.acceptance_min, t.acceptance_max, t.value_histogram_low, t.value_histogram_high
            ),
            suggestion: None,
        });
    }

    // Anomaly cuts
    let a = &config.anomaly;
    if a.column_span_threshold == 0 {
        errors.push("anomaly.column_span_threshold must be > 0".to_string());
    }
    if a.use_row_span_cut && a.row_span_threshold == 0 {
        errors.push(
            "anomaly.row_span_threshold = 0 rejects every cluster (disable use_row_span_cut instead)"
                .to_string(),
        );
    }

    // Strobe: the fallback must tile the cycle exactly
    let s = &config.strobe;
    if s.fallback_length == 0 || s.fallback_length > STROBE_MAX {
        errors.push(format!(
            "strobe.fallback_length = {} is outside 1..={STROBE_MAX}",
            s.fallback_length
        ));
    } else if CYCLE_LENGTH % s.fallback_length != 0 {
        errors.push(format!(
            "strobe.fallback_length = {} does not divide the cycle length {CYCLE_LENGTH}",
            s.fallback_length
        ));
    }
    if s.cycles_per_chunk == 0 {
        errors.push("strobe.cycles_per_chunk must be > 0".to_string());
    }

    // Geometry
    let g = &config.geometry;
    if g.chips_per_stave == 0 {
        errors.push("geometry.chips_per_stave must be > 0 (used as divisor)".to_string());
    }
    if g.layers.is_empty() {
        errors.push("geometry.layers must list at least one layer".to_string());
    }
    if let Some(i) = g
        .layers
        .iter()
        .position(|l| l.staves == 0 || l.chips_per_stave == 0)
    {
        errors.push(format!(
            "geometry.layers[{i}] must have non-zero staves and chips_per_stave"
        ));
    }
    let total_chips: u64 = g
        .layers
        .iter()
        .map(|l| u64::from(l.staves) * u64::from(l.chips_per_stave))
        .sum();
    if u64::from(g.roi_chip_bound) > total_chips {
        errors.push(format!(
            "geometry.roi_chip_bound = {} exceeds the {total_chips} chips in geometry.layers",
            g.roi_chip_bound
        ));
    }
    if !(0.0..=AZIMUTH_MAX).contains(&g.dead_zone_min)
        || !(0.0..=AZIMUTH_MAX).contains(&g.dead_zone_max)
        || g.dead_zone_min >= g.dead_zone_max
    {
        errors.push(format!(
            "geometry dead zone ({:.3}, {:.3}) must be an ordered sector inside [0, 2π]",
            g.dead_zone_min, g.dead_zone_max
        ));
    }
    if let Some(first) = g.layers.first() {
        if g.chips_per_stave != first.chips_per_stave {
            warnings.push(ValidationWarning {
                field: "geometry.chips_per_stave".to_string(),
                message: format!(
                    "geometry.chips_per_stave = {} differs from the innermost layer's {}; stave records will not match physical staves",
                    g.chips_per_stave, first.chips_per_stave
                ),
                suggestion: None,
            });
        }
    }

    // Cluster size binning: ascending
    let c = &config.cluster_size;
    if !c.pixel_thresholds.windows(2).all(|w| w[0] <= w[1]) {
        errors.push(format!(
            "cluster_size.pixel_thresholds {:?} must be ascending",
            c.pixel_thresholds
        ));
    }
    if !c.column_thresholds.windows(2).all(|w| w[0] <= w[1]) {
        errors.push(format!(
            "cluster_size.column_thresholds {:?} must be ascending",
            c.column_thresholds
        ));
    }
    if c.top_n == 0 {
        warnings.push(ValidationWarning {
            field: "cluster_size.top_n".to_string(),
            message: "cluster_size.top_n = 0 makes top_n_mean always 0".to_string(),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
