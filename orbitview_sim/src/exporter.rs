//! JSON exporter for recorded viewer runs.
//!
//! One summary per delivered snapshot: where the bodies were, how the camera
//! framed them, and what the last render pass drew.

use orbitview_core::{BodyId, CameraState, RenderStats, ResizePhase};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::SimError;

/// A single recorded frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Simulation time in seconds
    pub time_sec: f64,
    
    pub camera: CameraSummary,
    
    /// "stable" or "resizing"
    pub phase: String,
    
    /// Last render pass, if one has happened yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderSummary>,
    
    pub bodies: Vec<BodyPosition>,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<BodyId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CameraSummary {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl From<CameraState> for CameraSummary {
    fn from(state: CameraState) -> Self {
        Self {
            scale: state.scale,
            offset_x: state.offset_x,
            offset_y: state.offset_y,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenderSummary {
    pub degraded: bool,
    pub trail_segments: usize,
    pub max_stride: usize,
    pub velocity_indicators: usize,
}

impl From<RenderStats> for RenderSummary {
    fn from(stats: RenderStats) -> Self {
        Self {
            degraded: stats.degraded(),
            trail_segments: stats.trail_segments,
            max_stride: stats.max_stride,
            velocity_indicators: stats.velocity_indicators,
        }
    }
}

/// Position of a body plus the length of its trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyPosition {
    pub id: BodyId,
    pub x: f64,
    pub y: f64,
    pub trail_len: usize,
}

pub fn phase_name(phase: ResizePhase) -> &'static str {
    match phase {
        ResizePhase::Stable => "stable",
        ResizePhase::Resizing => "resizing",
    }
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,
    
    /// Seed used
    pub seed: u64,
    
    /// Duration in seconds
    pub duration_sec: f64,
    
    /// All frames
    pub frames: Vec<FrameSummary>,
    
    /// Final results
    pub passed: bool,
    
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }
    
    /// Adds a frame.
    pub fn add_frame(&mut self, frame: FrameSummary) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }
    
    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }
    
    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
