//! Config Validation Tests
//!
//! Typo detection on raw TOML and range validation on the parsed
//! `StudyConfig`, exercised independently from the pipeline.

use its_bkg_study::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use its_bkg_study::config::{ConfigError, StudyConfig};
use its_bkg_study::topology::LayerSpec;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_anomaly_threshold_warns_with_suggestion() {
    let toml_str = r#"
[anomaly]
column_span_treshold = 120
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("column_span_treshold"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("anomaly.column_span_threshold"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn typo_in_study_section_warns() {
    let toml_str = r#"
[study]
naem = "pp-2024"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("study.name"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[study]
name = "pp-2024-LHC24af"

[anomaly]
column_span_threshold = 127
row_span_threshold = 30
use_row_span_cut = true

[tagging]
acceptance_min = 5.7
acceptance_max = 8.7

[strobe]
fallback_length = 594
cycles_per_chunk = 32

[geometry]
chips_per_stave = 9
roi_chip_bound = 432

[cluster_size]
pixel_thresholds = [20, 100, 150]
column_thresholds = [20, 100, 128]
top_n = 10
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "Unexpected warnings: {warnings:?}");
    let config = StudyConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.tagging.acceptance_min, 5.7);
    assert_eq!(config.study.name, "pp-2024-LHC24af");
}

#[test]
fn completely_unknown_key_has_no_suggestion() {
    let warnings = validate_unknown_keys("[zdc]\nchannel = 3\n");
    assert_eq!(warnings.len(), 2, "table and key are both unknown");
    assert!(warnings.iter().all(|w| w.suggestion.is_none()));
}

#[test]
fn suggestion_respects_distance_limit() {
    let known = known_config_keys();
    assert_eq!(
        suggest_correction("strobe.fallback_lenght", &known).as_deref(),
        Some("strobe.fallback_length")
    );
    assert!(suggest_correction("strobe.something_else", &known).is_none());
}

#[test]
fn unknown_keys_do_not_fail_parsing() {
    let config = StudyConfig::from_toml_str("[anomaly]\ncolumn_span_treshold = 120\n").unwrap();
    assert_eq!(config.anomaly.column_span_threshold, 127, "typo leaves the default");
}

// ============================================================================
// Range Validation
// ============================================================================

fn validation_errors(toml_str: &str) -> Vec<String> {
    match StudyConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => errors,
        Err(other) => panic!("expected validation error, got {other}"),
        Ok(_) => Vec::new(),
    }
}

#[test]
fn empty_config_is_the_default() {
    let config = StudyConfig::from_toml_str("").unwrap();
    assert_eq!(
        config.to_toml().unwrap(),
        StudyConfig::default().to_toml().unwrap()
    );
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty(), "{errors:?}");
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn inverted_acceptance_window_rejected() {
    let errors = validation_errors("[tagging]\nacceptance_min = 9.0\nacceptance_max = 6.0\n");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("acceptance_min"));
}

#[test]
fn fallback_must_divide_cycle() {
    let errors = validation_errors("[strobe]\nfallback_length = 500\n");
    assert!(errors.iter().any(|e| e.contains("does not divide")), "{errors:?}");

    let errors = validation_errors("[strobe]\nfallback_length = 0\n");
    assert!(!errors.is_empty());

    assert!(validation_errors("[strobe]\nfallback_length = 198\n").is_empty());
}

#[test]
fn roi_beyond_layers_rejected() {
    let toml_str = r#"
[geometry]
roi_chip_bound = 200
layers = [{ staves = 4, chips_per_stave = 9 }]
"#;
    let errors = validation_errors(toml_str);
    assert!(errors.iter().any(|e| e.contains("roi_chip_bound")), "{errors:?}");
}

#[test]
fn zero_chips_per_stave_rejected() {
    let errors = validation_errors("[geometry]\nchips_per_stave = 0\n");
    assert!(errors.iter().any(|e| e.contains("chips_per_stave")));
}

#[test]
fn dead_zone_must_be_ordered() {
    let errors = validation_errors("[geometry]\ndead_zone_min = 3.0\ndead_zone_max = 1.0\n");
    assert!(errors.iter().any(|e| e.contains("dead zone")));
}

#[test]
fn thresholds_must_ascend() {
    let errors = validation_errors("[cluster_size]\npixel_thresholds = [100, 20, 150]\n");
    assert!(errors.iter().any(|e| e.contains("pixel_thresholds")));
}

#[test]
fn all_errors_reported_at_once() {
    let toml_str = r#"
[anomaly]
column_span_threshold = 0

[strobe]
cycles_per_chunk = 0
"#;
    assert_eq!(validation_errors(toml_str).len(), 2);
}

#[test]
fn wide_acceptance_window_only_warns() {
    let mut config = StudyConfig::default();
    config.tagging.acceptance_max = 30.0;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
}

// ============================================================================
// Synthetic Geometry and Round Trip
// ============================================================================

#[test]
fn synthetic_geometry() {
    let toml_str = r#"
[geometry]
chips_per_stave = 2
roi_chip_bound = 8
layers = [
  { staves = 2, chips_per_stave = 2 },
  { staves = 4, chips_per_stave = 2 },
]
"#;
    let config = StudyConfig::from_toml_str(toml_str).unwrap();
    let topology = config.topology();
    assert_eq!(topology.total_chips(), 12);
    assert_eq!(topology.layer_of(3), Some(0));
    assert_eq!(topology.layer_of(4), Some(1));
    assert_eq!(
        config.geometry.layers[1],
        LayerSpec {
            staves: 4,
            chips_per_stave: 2
        }
    );
}

#[test]
fn save_and_reload() {
    let mut config = StudyConfig::default();
    config.study.name = "round-trip".to_string();
    config.tagging.acceptance_min = 5.7;
    config.tagging.acceptance_max = 8.7;
    config.anomaly.use_row_span_cut = false;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study_config.toml");
    config.save_to_file(&path).unwrap();

    let loaded = StudyConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.study.name, "round-trip");
    assert_eq!(loaded.tagging.acceptance_max, 8.7);
    assert!(!loaded.anomaly.use_row_span_cut);
    assert_eq!(loaded.to_toml().unwrap(), config.to_toml().unwrap());
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StudyConfig::load_from_file(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}

#[test]
fn malformed_toml_is_parse_error_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[anomaly\ncolumn_span_threshold = 1").unwrap();
    match StudyConfig::load_from_file(&path).unwrap_err() {
        ConfigError::Parse(p, _) => assert_eq!(p, path),
        other => panic!("expected parse error, got {other}"),
    }
}
