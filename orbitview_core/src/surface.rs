//! Drawable surface abstraction.
//!
//! A [`Surface`] is the 2D target the renderer paints into: a backing buffer
//! measured in device pixels plus a drawing context with a base scale (the
//! device pixel ratio) and a current transform. Coordinates passed to the
//! primitive calls are interpreted under `base_scale * transform`.

use nalgebra::Matrix3;
use serde::Serialize;

use crate::camera::Viewport;
use crate::error::RenderError;
use crate::types::{Rgba, Vec2};

/// A drawable 2D target.
pub trait Surface {
    /// Prepares the context for a new pass.
    ///
    /// Returns `RenderError::SurfaceUnavailable` when there is nothing to draw
    /// into right now (detached, minimized, context lost).
    fn begin_frame(&mut self) -> Result<(), RenderError>;
    
    /// Resizes the backing buffer (device pixels). Resets the context state.
    fn resize_backing(&mut self, width: u32, height: u32);
    
    /// Sets the device-pixel base scale applied beneath every transform.
    fn set_base_scale(&mut self, scale: f64);
    
    /// Replaces the current transform (CSS pixel space).
    fn set_transform(&mut self, transform: Matrix3<f64>);
    
    /// Clears a CSS-pixel rectangle under the identity transform.
    fn clear(&mut self, width: f64, height: f64);
    
    fn stroke_line(&mut self, from: Vec2, to: Vec2, color: Rgba, width: f64);
    
    fn fill_circle(&mut self, center: Vec2, radius: f64, color: Rgba);
    
    /// Draws `text` horizontally centered on `anchor`, baseline at `anchor.y`.
    fn fill_text(&mut self, text: &str, anchor: Vec2, font_size: f64, color: Rgba);
    
    /// Flushes the pass to the output, if the surface buffers.
    fn end_frame(&mut self) {}
}

/// Keeps the backing buffer in step with the layout box.
///
/// The backing buffer is `css size * device pixel ratio`. Resizing it and
/// reapplying the base scale happen only when that product changes, never on
/// every frame.
#[derive(Debug, Clone, Default)]
pub struct BackingStore {
    size: Option<(u32, u32)>,
    resizes: u64,
}

impl BackingStore {
    /// Syncs `surface` to `viewport`. Returns true if the buffer was resized.
    pub fn sync<S: Surface + ?Sized>(&mut self, surface: &mut S, viewport: &Viewport) -> bool {
        let wanted = viewport.backing_size();
        if self.size == Some(wanted) {
            return false;
        }
        surface.resize_backing(wanted.0, wanted.1);
        surface.set_base_scale(viewport.device_pixel_ratio);
        self.size = Some(wanted);
        self.resizes += 1;
        true
    }
    
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }
    
    /// Number of times the buffer has been resized.
    pub fn resize_count(&self) -> u64 {
        self.resizes
    }
    
    /// Forgets the recorded size so the next sync resizes unconditionally.
    pub fn invalidate(&mut self) {
        self.size = None;
    }
}

// =============================================================================
// RECORDING SURFACE
// =============================================================================

/// One primitive call captured by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    ResizeBacking { width: u32, height: u32 },
    BaseScale { scale: f64 },
    Transform { scale: f64, tx: f64, ty: f64 },
    Clear { width: f64, height: f64 },
    Line { from: Vec2, to: Vec2, color: Rgba, width: f64 },
    Circle { center: Vec2, radius: f64, color: Rgba },
    Text { text: String, anchor: Vec2, font_size: f64, color: Rgba },
}

/// Display-list surface. Records every call of the current frame.
///
/// Used by tests and by the headless harness; it can be switched to
/// "unavailable" to exercise the skipped-frame path.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    available: bool,
    frame: Vec<DrawCommand>,
    frames_begun: u64,
    base_scale_applications: u64,
    backing: (u32, u32),
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            available: true,
            ..Default::default()
        }
    }
    
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }
    
    /// Commands of the most recent frame (setup commands included).
    pub fn commands(&self) -> &[DrawCommand] {
        &self.frame
    }
    
    pub fn frames_begun(&self) -> u64 {
        self.frames_begun
    }
    
    pub fn base_scale_applications(&self) -> u64 {
        self.base_scale_applications
    }
    
    pub fn backing(&self) -> (u32, u32) {
        self.backing
    }
    
    pub fn lines(&self) -> impl Iterator<Item = &DrawCommand> {
        self.frame.iter().filter(|c| matches!(c, DrawCommand::Line { .. }))
    }
    
    pub fn circles(&self) -> impl Iterator<Item = &DrawCommand> {
        self.frame.iter().filter(|c| matches!(c, DrawCommand::Circle { .. }))
    }
    
    pub fn texts(&self) -> impl Iterator<Item = &DrawCommand> {
        self.frame.iter().filter(|c| matches!(c, DrawCommand::Text { .. }))
    }
}

impl Surface for RecordingSurface {
    fn begin_frame(&mut self) -> Result<(), RenderError> {
        if !self.available {
            return Err(RenderError::SurfaceUnavailable("recording surface detached".to_string()));
        }
        self.frame.clear();
        self.frames_begun += 1;
        Ok(())
    }
    
    fn resize_backing(&mut self, width: u32, height: u32) {
        self.backing = (width, height);
        self.frame.push(DrawCommand::ResizeBacking { width, height });
    }
    
    fn set_base_scale(&mut self, scale: f64) {
        self.base_scale_applications += 1;
        self.frame.push(DrawCommand::BaseScale { scale });
    }
    
    fn set_transform(&mut self, transform: Matrix3<f64>) {
        self.frame.push(DrawCommand::Transform {
            scale: transform[(0, 0)],
            tx: transform[(0, 2)],
            ty: transform[(1, 2)],
        });
    }
    
    fn clear(&mut self, width: f64, height: f64) {
        self.frame.push(DrawCommand::Clear { width, height });
    }
    
    fn stroke_line(&mut self, from: Vec2, to: Vec2, color: Rgba, width: f64) {
        self.frame.push(DrawCommand::Line { from, to, color, width });
    }
    
    fn fill_circle(&mut self, center: Vec2, radius: f64, color: Rgba) {
        self.frame.push(DrawCommand::Circle { center, radius, color });
    }
    
    fn fill_text(&mut self, text: &str, anchor: Vec2, font_size: f64, color: Rgba) {
        self.frame.push(DrawCommand::Text {
            text: text.to_string(),
            anchor,
            font_size,
            color,
        });
    }
}
