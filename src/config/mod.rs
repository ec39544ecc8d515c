//! Configuration management for Lumen
//!
//! This module handles loading, parsing, and validating configuration from
//! TOML files: window geometry and identity, plus animation pacing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration struct containing all Lumen settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LumenConfig {
    /// Window geometry and identity
    #[serde(default)]
    pub window: WindowConfig,

    /// Animation pacing
    #[serde(default)]
    pub animation: AnimationConfig,
}

/// Window geometry and identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    /// Surface width in pixels
    #[serde(default = "WindowConfig::default_width")]
    pub width: u32,

    /// Surface height in pixels
    #[serde(default = "WindowConfig::default_height")]
    pub height: u32,

    /// Toplevel title
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,

    /// Toplevel application id
    #[serde(default = "WindowConfig::default_app_id")]
    pub app_id: String,
}

/// Animation pacing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimationConfig {
    /// Phase advance per second of wall time
    #[serde(default = "AnimationConfig::default_rate")]
    pub rate: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            title: Self::default_title(),
            app_id: Self::default_app_id(),
        }
    }
}

impl WindowConfig {
    fn default_width() -> u32 {
        640
    }
    fn default_height() -> u32 {
        480
    }
    fn default_title() -> String {
        "Lumen".to_string()
    }
    fn default_app_id() -> String {
        "dev.lumen.Lumen".to_string()
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            rate: Self::default_rate(),
        }
    }
}

impl AnimationConfig {
    fn default_rate() -> f32 {
        24.0
    }
}

impl LumenConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Path::new(&home).join(path.strip_prefix("~").unwrap_or(path))
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: LumenConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            anyhow::bail!(
                "Invalid window geometry: {}x{} (both dimensions must be nonzero)",
                self.window.width,
                self.window.height
            );
        }

        if !self.animation.rate.is_finite() || self.animation.rate < 0.0 {
            anyhow::bail!(
                "Invalid animation rate: {} (must be finite and non-negative)",
                self.animation.rate
            );
        }

        Ok(())
    }

    /// Bytes of one full frame at the configured geometry (XRGB8888).
    pub fn frame_bytes(&self) -> usize {
        self.window.width as usize * self.window.height as usize * crate::render::BYTES_PER_PIXEL
    }
}

#[cfg(test)]
mod tests;
