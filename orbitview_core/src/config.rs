//! Viewer configuration.
//!
//! All tunables of the viewer live here with their production defaults. The
//! struct is serde-deserializable so a harness can load overrides from JSON;
//! missing fields fall back to the defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ViewError;

/// Trails never hold more than this many positions per body.
pub const MAX_TRAIL_LENGTH: usize = 100;

/// Camera framing and smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Margin added on each side of the fitted bounds (simulation units)
    pub padding: f64,
    /// Lower zoom limit
    pub min_zoom: f64,
    /// Upper zoom limit
    pub max_zoom: f64,
    /// Fraction of the remaining error removed per frame tick
    pub smoothing: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            padding: 50.0,
            min_zoom: 0.1,
            max_zoom: 3.0,
            smoothing: 0.1,
        }
    }
}

impl CameraConfig {
    /// Rejects an empty or non-positive zoom range and smoothing outside (0, 1].
    pub fn validate(&self) -> Result<(), ViewError> {
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(ViewError::Config(format!(
                "zoom range [{}, {}] is empty or non-positive",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(ViewError::Config(format!(
                "smoothing {} outside (0, 1]",
                self.smoothing
            )));
        }
        Ok(())
    }
}

/// Rendering constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// On-screen trail stroke width in pixels (divided by zoom)
    pub trail_width_px: f64,
    /// On-screen label font size in pixels (divided by zoom)
    pub label_font_px: f64,
    /// Velocity indicator length factor (simulation seconds)
    pub velocity_scale: f64,
    /// Segment budget per trail in degraded mode
    pub degraded_segments: usize,
    /// Alpha of the oldest trail segment
    pub trail_min_alpha: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            trail_width_px: 2.0,
            label_font_px: 12.0,
            velocity_scale: 0.1,
            degraded_segments: 30,
            trail_min_alpha: 0.1,
        }
    }
}

/// Top-level viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub render: RenderConfig,
    /// Maximum stored positions per trail
    pub max_trail_length: usize,
    /// Quiet period after the last resize event before settling
    pub settle_delay_ms: u64,
    /// Display refresh rate driving the camera tick
    pub frame_rate_hz: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            render: RenderConfig::default(),
            max_trail_length: MAX_TRAIL_LENGTH,
            settle_delay_ms: 100,
            frame_rate_hz: 60,
        }
    }
}

impl ViewerConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ViewError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ViewError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
    
    /// Parses a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ViewError> {
        let config: ViewerConfig =
            serde_json::from_str(text).map_err(|e| ViewError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
    
    /// Rejects settings the viewer cannot run with.
    pub fn validate(&self) -> Result<(), ViewError> {
        self.camera.validate()?;
        if self.max_trail_length == 0 || self.frame_rate_hz == 0 {
            return Err(ViewError::Config(
                "max_trail_length and frame_rate_hz must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
    
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
    
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz as f64)
    }
}
