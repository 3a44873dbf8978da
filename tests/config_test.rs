//! Integration tests for Settings loading with layered precedence.
//!
//! These tests pass explicit global/local paths (temp directories only), so
//! they never depend on the user's real config.

use std::fs;

use tempfile::TempDir;

use subform::application::ApplicationError;
use subform::config::{OutputFormat, Settings};

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================
// Layering
// ============================================================

#[test]
fn given_global_config_when_load_then_overrides_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let global = write(&dir, "global.toml", "[output]\nformat = \"json\"\npretty = false\n");

    // Act
    let settings = Settings::load_from(Some(&global), None).expect("load settings");

    // Assert
    assert_eq!(settings.output.format, OutputFormat::Json);
    assert!(!settings.output.pretty);
    assert!(settings.output.color, "unspecified keys keep their defaults");
    assert!(settings.check.fail_on_errors);
}

#[test]
fn given_global_and_local_config_when_load_then_local_wins_per_key() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let global = write(&dir, "global.toml", "[output]\nformat = \"json\"\npretty = false\n");
    let local = write(&dir, "local.toml", "[output]\npretty = true\n[check]\nfail_on_errors = false\n");

    // Act
    let settings = Settings::load_from(Some(&global), Some(&local)).expect("load settings");

    // Assert
    assert_eq!(settings.output.format, OutputFormat::Json, "kept from global");
    assert!(settings.output.pretty, "overridden by local");
    assert!(!settings.check.fail_on_errors);
}

#[test]
fn given_absent_global_config_when_load_then_defaults() {
    let dir = TempDir::new().unwrap();

    let settings =
        Settings::load_from(Some(&dir.path().join("missing.toml")), None).expect("load settings");

    assert_eq!(settings, Settings::default());
}

#[test]
fn given_absent_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();

    let result = Settings::load_from(None, Some(&dir.path().join("missing.toml")));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_toml_when_load_then_config_error_names_file() {
    let dir = TempDir::new().unwrap();
    let local = write(&dir, "broken.toml", "[output\nformat = ");

    let err = Settings::load_from(None, Some(&local)).unwrap_err();

    assert!(err.to_string().contains("broken.toml"), "{err}");
}

#[test]
fn given_unknown_format_value_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let local = write(&dir, "local.toml", "[output]\nformat = \"yaml\"\n");

    assert!(Settings::load_from(None, Some(&local)).is_err());
}

#[test]
fn given_effective_settings_when_rendered_then_reloadable() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let local = write(&dir, "local.toml", "[output]\nformat = \"json\"\n");
    let settings = Settings::load_from(None, Some(&local)).unwrap();

    // Act
    let rendered = write(&dir, "rendered.toml", &settings.to_toml().unwrap());
    let reloaded = Settings::load_from(None, Some(&rendered)).unwrap();

    // Assert
    assert_eq!(reloaded, settings);
}
