//! Auto-framing camera with exponential smoothing.
//!
//! The controller keeps two sets of parameters: the *target* (recomputed from
//! bounds whenever a snapshot arrives) and the *current* values that are drawn.
//! Current values only ever move toward the target, one fixed fraction per
//! display frame, so the view glides even when snapshots arrive in bursts.
//!
//! # Transform
//!
//! ```text
//! screen = (sim + offset) * scale + viewport_center
//! sim    = (screen - viewport_center) / scale - offset
//! ```

use nalgebra::{Matrix3, Vector2};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bounds::Bounds;
use crate::config::CameraConfig;
use crate::types::Vec2;

/// Size of the drawable layout box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// CSS pixels
    pub width: f64,
    /// CSS pixels
    pub height: f64,
    /// Device pixels per CSS pixel
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }
    
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
    
    /// Backing buffer size in device pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        let dpr = if self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        };
        (
            (self.width * dpr).round().max(0.0) as u32,
            (self.height * dpr).round().max(0.0) as u32,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0, 1.0)
    }
}

/// Current and target camera parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub target_scale: f64,
    pub target_offset_x: f64,
    pub target_offset_y: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            target_scale: 1.0,
            target_offset_x: 0.0,
            target_offset_y: 0.0,
        }
    }
}

impl CameraState {
    /// Largest absolute difference between a current field and its target.
    pub fn residual(&self) -> f64 {
        (self.target_scale - self.scale)
            .abs()
            .max((self.target_offset_x - self.offset_x).abs())
            .max((self.target_offset_y - self.offset_y).abs())
    }
    
    /// Composed transform for drawing into `viewport`.
    pub fn transform(&self, viewport: &Viewport) -> CameraTransform {
        CameraTransform {
            scale: self.scale,
            offset: Vec2::new(self.offset_x, self.offset_y),
            center: viewport.center(),
        }
    }
}

/// The translate → scale → translate mapping from simulation space to CSS
/// pixels. The renderer draws with it and the hit tester inverts it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub scale: f64,
    pub offset: Vec2,
    pub center: Vec2,
}

impl CameraTransform {
    pub fn to_screen(&self, sim: Vec2) -> Vec2 {
        Vec2::new(
            (sim.x + self.offset.x) * self.scale + self.center.x,
            (sim.y + self.offset.y) * self.scale + self.center.y,
        )
    }
    
    pub fn to_sim(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            (screen.x - self.center.x) / self.scale - self.offset.x,
            (screen.y - self.center.y) / self.scale - self.offset.y,
        )
    }
    
    /// Homogeneous matrix: `T(center) * S(scale) * T(offset)`.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new_translation(&Vector2::new(self.center.x, self.center.y))
            * Matrix3::new_scaling(self.scale)
            * Matrix3::new_translation(&Vector2::new(self.offset.x, self.offset.y))
    }
}

/// Drives [`CameraState`] toward a bounds-fitting target.
#[derive(Debug, Clone)]
pub struct CameraController {
    config: CameraConfig,
    state: CameraState,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl CameraController {
    /// Creates a camera at rest at zoom 1, pulled into the configured range.
    ///
    /// An unusable zoom range or smoothing factor is replaced by the defaults.
    pub fn new(config: CameraConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "invalid camera config, using default zoom and smoothing");
                CameraConfig {
                    padding: config.padding,
                    ..CameraConfig::default()
                }
            }
        };
        let scale = 1.0f64.clamp(config.min_zoom, config.max_zoom);
        Self {
            config,
            state: CameraState {
                scale,
                target_scale: scale,
                ..CameraState::default()
            },
        }
    }
    
    pub fn state(&self) -> CameraState {
        self.state
    }
    
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
    
    pub fn transform(&self, viewport: &Viewport) -> CameraTransform {
        self.state.transform(viewport)
    }
    
    /// Recomputes the target so `bounds` (plus padding) fills the viewport.
    ///
    /// `None` bounds keep the previous target. Returns true if the target
    /// changed.
    pub fn set_target(&mut self, bounds: Option<Bounds>, viewport_width: f64, viewport_height: f64) -> bool {
        let Some(bounds) = bounds else {
            return false;
        };
        
        let padded_width = bounds.width() + self.config.padding * 2.0;
        let padded_height = bounds.height() + self.config.padding * 2.0;
        let fit = (viewport_width / padded_width).min(viewport_height / padded_height);
        let scale = if fit.is_nan() {
            self.state.target_scale
        } else {
            fit.clamp(self.config.min_zoom, self.config.max_zoom)
        };
        let center = bounds.center();
        
        let previous = self.state;
        self.state.target_scale = scale;
        self.state.target_offset_x = -center.x;
        self.state.target_offset_y = -center.y;
        
        previous.target_scale != self.state.target_scale
            || previous.target_offset_x != self.state.target_offset_x
            || previous.target_offset_y != self.state.target_offset_y
    }
    
    /// Advances the current parameters one step toward the target.
    ///
    /// Runs once per display frame whether or not a snapshot arrived. The step
    /// is a fixed fraction of the remaining error, independent of elapsed time.
    /// Returns true if any current field moved.
    pub fn tick(&mut self) -> bool {
        let k = self.config.smoothing;
        let s = &mut self.state;
        let before = (s.scale, s.offset_x, s.offset_y);
        
        s.scale += (s.target_scale - s.scale) * k;
        s.offset_x += (s.target_offset_x - s.offset_x) * k;
        s.offset_y += (s.target_offset_y - s.offset_y) * k;
        // Guard the zoom range against rounding.
        s.scale = s.scale.clamp(self.config.min_zoom, self.config.max_zoom);
        
        before != (s.scale, s.offset_x, s.offset_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    
    fn bounds(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Bounds {
        Bounds { min_x, max_x, min_y, max_y }
    }
    
    #[test]
    fn test_target_fits_padded_bounds() {
        let mut cam = CameraController::default();
        // 300 x 100 box + 50 padding per side = 400 x 200
        assert!(cam.set_target(Some(bounds(0.0, 300.0, -50.0, 50.0)), 800.0, 600.0));
        
        let s = cam.state();
        assert_relative_eq!(s.target_scale, 2.0, epsilon = 1e-12);
        assert_relative_eq!(s.target_offset_x, -150.0, epsilon = 1e-12);
        assert_relative_eq!(s.target_offset_y, 0.0, epsilon = 1e-12);
        // Current values untouched until ticks run
        assert_eq!(s.scale, 1.0);
    }
    
    #[test]
    fn test_none_bounds_keeps_target() {
        let mut cam = CameraController::default();
        cam.set_target(Some(bounds(-10.0, 10.0, -10.0, 10.0)), 800.0, 600.0);
        let before = cam.state();
        
        assert!(!cam.set_target(None, 800.0, 600.0));
        assert_eq!(cam.state(), before);
    }
    
    #[test]
    fn test_degenerate_bounds_clamp_to_max_zoom() {
        let mut cam = CameraController::default();
        cam.set_target(Some(bounds(5.0, 5.0, 5.0, 5.0)), 1920.0, 1080.0);
        assert_eq!(cam.state().target_scale, 3.0);
        
        cam.set_target(Some(bounds(-1.0e6, 1.0e6, -1.0e6, 1.0e6)), 800.0, 600.0);
        assert_eq!(cam.state().target_scale, 0.1);
    }
    
    #[test]
    fn test_residual_decays_geometrically() {
        let mut cam = CameraController::default();
        cam.set_target(Some(bounds(100.0, 300.0, 100.0, 300.0)), 800.0, 600.0);
        let start = cam.state();
        let initial_x = start.target_offset_x - start.offset_x;
        let initial_scale = start.target_scale - start.scale;
        
        for n in 1..=50 {
            cam.tick();
            let s = cam.state();
            let expected = 0.9f64.powi(n);
            assert_relative_eq!(s.target_offset_x - s.offset_x, initial_x * expected, max_relative = 1e-9);
            assert_relative_eq!(s.target_scale - s.scale, initial_scale * expected, max_relative = 1e-9);
        }
        
        let s = cam.state();
        assert!((s.target_offset_x - s.offset_x).abs() < 0.01 * initial_x.abs());
    }
    
    #[test]
    fn test_tick_reports_no_motion_at_rest() {
        let mut cam = CameraController::default();
        assert!(!cam.tick());
    }
    
    #[test]
    fn test_matrix_matches_closed_form() {
        let t = CameraTransform {
            scale: 0.75,
            offset: Vec2::new(-120.0, 40.0),
            center: Vec2::new(400.0, 300.0),
        };
        let p = Vec2::new(33.0, -71.0);
        let m = t.matrix() * nalgebra::Vector3::new(p.x, p.y, 1.0);
        let q = t.to_screen(p);
        
        assert_relative_eq!(m.x, q.x, epsilon = 1e-9);
        assert_relative_eq!(m.y, q.y, epsilon = 1e-9);
        
        let inv = t.matrix().try_inverse().unwrap() * nalgebra::Vector3::new(q.x, q.y, 1.0);
        let back = t.to_sim(q);
        assert_relative_eq!(inv.x, back.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
    }
    
    #[test]
    fn test_backing_size_rounds() {
        assert_eq!(Viewport::new(801.0, 600.5, 1.5).backing_size(), (1202, 901));
        assert_eq!(Viewport::new(10.0, 10.0, 0.0).backing_size(), (10, 10));
    }
    
    #[test]
    fn test_starts_inside_narrow_zoom_range() {
        let above = CameraController::new(CameraConfig {
            min_zoom: 1.5,
            ..CameraConfig::default()
        });
        assert_eq!(above.state().scale, 1.5);
        assert_eq!(above.state().target_scale, 1.5);
        
        let mut below = CameraController::new(CameraConfig {
            max_zoom: 0.5,
            ..CameraConfig::default()
        });
        assert_eq!(below.state().scale, 0.5);
        // Already at the target, so a tick does not jump anywhere
        assert!(!below.tick());
        assert_eq!(below.state().scale, 0.5);
    }
    
    #[test]
    fn test_scale_eases_within_custom_range() {
        let mut cam = CameraController::new(CameraConfig {
            min_zoom: 2.0,
            max_zoom: 4.0,
            ..CameraConfig::default()
        });
        cam.set_target(Some(bounds(-1.0e6, 1.0e6, -1.0e6, 1.0e6)), 800.0, 600.0);
        assert_eq!(cam.state().target_scale, 2.0);
        
        cam.set_target(Some(bounds(0.0, 0.0, 0.0, 0.0)), 1920.0, 1080.0);
        cam.tick();
        // One tenth of the way from 2 toward 4
        assert_relative_eq!(cam.state().scale, 2.2, epsilon = 1e-12);
    }
    
    #[test]
    fn test_inverted_zoom_range_falls_back_to_defaults() {
        let mut cam = CameraController::new(CameraConfig {
            min_zoom: 2.0,
            max_zoom: 1.0,
            padding: 10.0,
            ..CameraConfig::default()
        });
        assert_eq!(cam.config().min_zoom, 0.1);
        assert_eq!(cam.config().max_zoom, 3.0);
        assert_eq!(cam.config().padding, 10.0);
        
        cam.set_target(Some(bounds(-10.0, 10.0, -10.0, 10.0)), 800.0, 600.0);
        cam.tick();
        assert!((0.1..=3.0).contains(&cam.state().scale));
    }
    
    proptest! {
        #[test]
        fn prop_scale_stays_in_custom_zoom_range(
            min_zoom in 0.05..2.0f64,
            span in 0.0..5.0f64,
            extent in 0.0..1.0e5f64,
            ticks in 0usize..80,
        ) {
            let max_zoom = min_zoom + span;
            let mut cam = CameraController::new(CameraConfig {
                min_zoom,
                max_zoom,
                ..CameraConfig::default()
            });
            cam.set_target(Some(bounds(0.0, extent, 0.0, extent)), 800.0, 600.0);
            for _ in 0..ticks {
                cam.tick();
                let scale = cam.state().scale;
                prop_assert!(scale >= min_zoom && scale <= max_zoom);
            }
        }
        
        #[test]
        fn prop_scale_stays_in_zoom_range(
            x in -1.0e5..1.0e5f64,
            y in -1.0e5..1.0e5f64,
            w in 0.0..1.0e5f64,
            h in 0.0..1.0e5f64,
            vw in 1.0..4000.0f64,
            vh in 1.0..4000.0f64,
            ticks in 0usize..80,
        ) {
            let mut cam = CameraController::default();
            cam.set_target(Some(bounds(x, x + w, y, y + h)), vw, vh);
            for _ in 0..ticks {
                cam.tick();
            }
            let s = cam.state();
            prop_assert!((0.1..=3.0).contains(&s.target_scale));
            prop_assert!((0.1..=3.0).contains(&s.scale));
        }
    }
}
