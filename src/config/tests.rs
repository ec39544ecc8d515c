//! Unit tests for configuration module
//!
//! Tests configuration parsing, validation, and edge cases in
//! configuration handling.

use super::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_configuration_is_valid() {
    let config = LumenConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.window.width, 640);
    assert_eq!(config.window.height, 480);
    assert_eq!(config.window.title, "Lumen");
    assert!(config.animation.rate > 0.0);
}

#[test]
fn test_frame_bytes_matches_geometry() {
    let config = LumenConfig::default();
    assert_eq!(config.frame_bytes(), 640 * 480 * 4);
}

#[test]
fn test_load_from_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("lumen.toml");
    fs::write(
        &path,
        r#"
[window]
width = 800
height = 600
title = "checkers"

[animation]
rate = 48.0
"#,
    )?;

    let config = LumenConfig::load(&path)?;
    assert_eq!(config.window.width, 800);
    assert_eq!(config.window.height, 600);
    assert_eq!(config.window.title, "checkers");
    // Unset fields fall back to defaults.
    assert_eq!(config.window.app_id, "dev.lumen.Lumen");
    assert_eq!(config.animation.rate, 48.0);
    Ok(())
}

#[test]
fn test_partial_file_uses_defaults() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("lumen.toml");
    fs::write(&path, "[animation]\nrate = 12.0\n")?;

    let config = LumenConfig::load(&path)?;
    assert_eq!(config.window, WindowConfig::default());
    assert_eq!(config.animation.rate, 12.0);
    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let result = LumenConfig::load("/nonexistent/lumen.toml");
    assert!(result.is_err());
}

#[test]
fn test_malformed_toml_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("lumen.toml");
    fs::write(&path, "[window\nwidth = ")?;

    assert!(LumenConfig::load(&path).is_err());
    Ok(())
}

#[test]
fn test_zero_geometry_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("lumen.toml");
    fs::write(&path, "[window]\nwidth = 0\n")?;

    let err = LumenConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("window geometry"));
    Ok(())
}

#[test]
fn test_negative_rate_rejected() {
    let mut config = LumenConfig::default();
    config.animation.rate = -1.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_serialization_roundtrip() -> Result<()> {
    let original = LumenConfig::default();
    let toml_string = toml::to_string(&original)?;
    let deserialized: LumenConfig = toml::from_str(&toml_string)?;
    assert_eq!(original, deserialized);
    Ok(())
}
