//! Trail and body renderer.
//!
//! One pass paints, in order: a full clear, every trail (oldest segments
//! faint, newest opaque), then every body with its heading line and id label.
//! Line widths and font sizes are divided by the zoom so they keep a constant
//! on-screen size.

use nalgebra::Matrix3;
use serde::Serialize;

use crate::camera::{CameraState, Viewport};
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::surface::{BackingStore, Surface};
use crate::trails::{TrailRecord, TrailStore};
use crate::types::{Body, Rgb, Rgba, Vec2};

const LABEL_GAP_PX: f64 = 4.0;
const VELOCITY_WIDTH_PX: f64 = 1.0;
const VELOCITY_ALPHA: f64 = 0.6;

/// Rendering fidelity for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    Full,
    /// Strided trails, no velocity indicators
    Degraded,
}

/// Everything one pass reads, captured together at the start of the pass.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub camera: CameraState,
    pub viewport: Viewport,
    pub trails: &'a TrailStore,
    pub bodies: &'a [Body],
}

/// What a pass drew.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderStats {
    pub fidelity: Fidelity,
    pub bodies: usize,
    pub trail_segments: usize,
    /// Largest stride used across trails (1 = every point)
    pub max_stride: usize,
    pub velocity_indicators: usize,
    pub labels: usize,
    pub backing_resized: bool,
    pub scale: f64,
}

impl RenderStats {
    pub fn degraded(&self) -> bool {
        self.fidelity == Fidelity::Degraded
    }
}

/// Paints [`FrameView`]s onto a [`Surface`].
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
    backing: BackingStore,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            backing: BackingStore::default(),
        }
    }
    
    pub fn backing(&self) -> &BackingStore {
        &self.backing
    }
    
    /// Trail stride for a trail of `len` points.
    pub fn stride(&self, len: usize, fidelity: Fidelity) -> usize {
        match fidelity {
            Fidelity::Full => 1,
            Fidelity::Degraded => (len / self.config.degraded_segments.max(1)).max(1),
        }
    }
    
    /// Alpha of the segment starting at point `i` of a `len`-point trail.
    pub fn segment_alpha(&self, i: usize, len: usize) -> f64 {
        let min = self.config.trail_min_alpha;
        min + (i as f64 / len as f64) * (1.0 - min)
    }
    
    /// Runs one render pass.
    pub fn draw<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        frame: &FrameView<'_>,
        fidelity: Fidelity,
    ) -> Result<RenderStats, RenderError> {
        surface.begin_frame()?;
        let backing_resized = self.backing.sync(surface, &frame.viewport);
        
        surface.set_transform(Matrix3::identity());
        surface.clear(frame.viewport.width, frame.viewport.height);
        
        let transform = frame.camera.transform(&frame.viewport);
        surface.set_transform(transform.matrix());
        
        let mut stats = RenderStats {
            fidelity,
            bodies: frame.bodies.len(),
            trail_segments: 0,
            max_stride: 1,
            velocity_indicators: 0,
            labels: 0,
            backing_resized,
            scale: transform.scale,
        };
        
        // Trails sit underneath every body, so they all go first.
        for body in frame.bodies {
            if let Some(trail) = frame.trails.get(body.id) {
                self.draw_trail(surface, trail, transform.scale, fidelity, &mut stats);
            }
        }
        for body in frame.bodies {
            self.draw_body(surface, body, transform.scale, fidelity, &mut stats);
        }
        
        surface.end_frame();
        Ok(stats)
    }
    
    fn draw_trail<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        trail: &TrailRecord,
        scale: f64,
        fidelity: Fidelity,
        stats: &mut RenderStats,
    ) {
        let points = trail.positions();
        let len = points.len();
        if len < 2 {
            return;
        }
        
        let stride = self.stride(len, fidelity);
        stats.max_stride = stats.max_stride.max(stride);
        
        let mut indices: Vec<usize> = (0..len).step_by(stride).collect();
        if indices.last() != Some(&(len - 1)) {
            indices.push(len - 1);
        }
        
        let width = self.config.trail_width_px / scale;
        for pair in indices.windows(2) {
            let (i, j) = (pair[0], pair[1]);
            let color = trail.color.with_alpha(self.segment_alpha(i, len));
            surface.stroke_line(points[i], points[j], color, width);
            stats.trail_segments += 1;
        }
    }
    
    fn draw_body<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        body: &Body,
        scale: f64,
        fidelity: Fidelity,
        stats: &mut RenderStats,
    ) {
        let color = Rgba::opaque(Rgb::from_hex(&body.color));
        surface.fill_circle(body.position, body.radius, color);
        
        if fidelity == Fidelity::Full {
            let tip = body.position + body.velocity.scaled(self.config.velocity_scale);
            surface.stroke_line(
                body.position,
                tip,
                Rgb::WHITE.with_alpha(VELOCITY_ALPHA),
                VELOCITY_WIDTH_PX / scale,
            );
            stats.velocity_indicators += 1;
        }
        
        let anchor = Vec2::new(
            body.position.x,
            body.position.y - body.radius - LABEL_GAP_PX / scale,
        );
        surface.fill_text(
            &body.id.to_string(),
            anchor,
            self.config.label_font_px / scale,
            Rgba::opaque(Rgb::WHITE),
        );
        stats.labels += 1;
    }
}
