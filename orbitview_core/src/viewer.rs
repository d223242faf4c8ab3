//! The viewer: single owner of all camera, trail and resize state.
//!
//! # Data Flow
//!
//! ```text
//! snapshot ──▶ TrailStore.update ──▶ bounds::compute ──▶ CameraController.set_target
//!                                                              │
//! frame tick ──▶ CameraController.tick ─────────────────────────┤
//!                                                              ▼
//!                                           Renderer.draw(camera, trails, bodies)
//!
//! pointer ──▶ hit_test::locate(camera transform, bodies) ──▶ ViewerEvent::Selection
//! ```
//!
//! Every mutating call marks what it changed; a render pass runs at the end of
//! the call if anything is marked. Rendering has no schedule of its own.

use std::time::Duration;

use tracing::{debug, trace};

use crate::bounds;
use crate::camera::{CameraController, CameraState, CameraTransform, Viewport};
use crate::config::ViewerConfig;
use crate::hit_test;
use crate::render::{Fidelity, FrameView, RenderStats, Renderer};
use crate::resize::{ResizeCoordinator, ResizePhase, SettleTicket};
use crate::surface::Surface;
use crate::trails::TrailStore;
use crate::types::{Body, BodyId, Vec2};

/// Notifications published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// A click resolved to a body, or to nothing
    Selection(Option<BodyId>),
    /// A render pass completed
    Rendered(RenderStats),
    /// A resize burst ended
    Settled,
}

/// Result of a pointer click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Selected(Option<BodyId>),
    /// Dropped because a resize is in progress; the prior selection stands
    Ignored,
}

/// Counters for diagnostics and harness reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerStats {
    pub frames: u64,
    pub snapshots: u64,
    pub renders: u64,
    pub degraded_renders: u64,
    pub skipped_renders: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Invalidation {
    bodies: bool,
    trails: bool,
    camera: bool,
    viewport: bool,
}

impl Invalidation {
    fn any(&self) -> bool {
        self.bodies || self.trails || self.camera || self.viewport
    }
}

type Listener = Box<dyn FnMut(&ViewerEvent) + Send>;

/// Owns the view state for one surface.
pub struct Viewer<S: Surface> {
    config: ViewerConfig,
    surface: S,
    viewport: Viewport,
    bodies: Vec<Body>,
    trails: TrailStore,
    camera: CameraController,
    resize: ResizeCoordinator,
    renderer: Renderer,
    selection: Option<BodyId>,
    invalidated: Invalidation,
    listeners: Vec<Listener>,
    stats: ViewerStats,
}

impl<S: Surface> Viewer<S> {
    pub fn new(config: ViewerConfig, surface: S, viewport: Viewport) -> Self {
        Self {
            trails: TrailStore::new(config.max_trail_length),
            camera: CameraController::new(config.camera),
            resize: ResizeCoordinator::new(config.settle_delay()),
            renderer: Renderer::new(config.render),
            config,
            surface,
            viewport,
            bodies: Vec::new(),
            selection: None,
            invalidated: Invalidation {
                viewport: true,
                ..Default::default()
            },
            listeners: Vec::new(),
            stats: ViewerStats::default(),
        }
    }
    
    /// Registers a listener for [`ViewerEvent`]s.
    pub fn subscribe(&mut self, listener: impl FnMut(&ViewerEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }
    
    // =========================================================================
    // INPUTS
    // =========================================================================
    
    /// Accepts a new snapshot from the simulation.
    pub fn on_snapshot(&mut self, bodies: Vec<Body>) {
        self.stats.snapshots += 1;
        self.invalidated.trails |= self.trails.update(&bodies);
        self.bodies = bodies;
        self.invalidated.bodies = true;
        
        if self.resize.phase() == ResizePhase::Stable {
            self.retarget();
        }
        self.flush();
    }
    
    /// One display refresh: advances the camera and renders if needed.
    ///
    /// Also retries a pass that was skipped because the surface was missing.
    pub fn on_frame(&mut self) {
        self.stats.frames += 1;
        self.invalidated.camera |= self.camera.tick();
        self.flush();
    }
    
    /// Handles a resize of the layout box at `now`.
    ///
    /// Rendering degrades immediately. The caller must arm a settle timer for
    /// the returned ticket, replacing any previous one.
    pub fn on_resize(&mut self, viewport: Viewport, now: Duration) -> SettleTicket {
        self.viewport = viewport;
        let ticket = self.resize.on_resize(now);
        trace!(width = viewport.width, height = viewport.height, generation = ticket.generation, "resize");
        self.invalidated.viewport = true;
        self.flush();
        ticket
    }
    
    /// Handles a settle timer firing for `generation`.
    ///
    /// On the current generation: recomputes the camera target and forces
    /// exactly one full-fidelity pass. Returns true if the resize settled.
    pub fn on_settle(&mut self, generation: u64) -> bool {
        if !self.resize.settle(generation) {
            return false;
        }
        self.retarget();
        self.render(Fidelity::Full);
        self.emit(ViewerEvent::Settled);
        true
    }
    
    /// Fires the settle timer if its deadline has passed on the caller's clock.
    pub fn poll_settle(&mut self, now: Duration) -> bool {
        match self.resize.pending() {
            Some(ticket) if now >= ticket.deadline => self.on_settle(ticket.generation),
            _ => false,
        }
    }
    
    /// Resolves a click at CSS pixel `(x, y)`.
    pub fn click(&mut self, x: f64, y: f64) -> ClickOutcome {
        if self.resize.phase() == ResizePhase::Resizing {
            debug!(x, y, "click ignored during resize");
            return ClickOutcome::Ignored;
        }
        let selected = hit_test::locate(Vec2::new(x, y), &self.transform(), &self.bodies);
        self.selection = selected;
        self.emit(ViewerEvent::Selection(selected));
        ClickOutcome::Selected(selected)
    }
    
    // =========================================================================
    // ACCESSORS
    // =========================================================================
    
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
    
    pub fn camera(&self) -> CameraState {
        self.camera.state()
    }
    
    /// The transform the next pass will draw with.
    pub fn transform(&self) -> CameraTransform {
        self.camera.transform(&self.viewport)
    }
    
    pub fn trails(&self) -> &TrailStore {
        &self.trails
    }
    
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }
    
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
    
    pub fn selection(&self) -> Option<BodyId> {
        self.selection
    }
    
    pub fn phase(&self) -> ResizePhase {
        self.resize.phase()
    }
    
    pub fn pending_settle(&self) -> Option<SettleTicket> {
        self.resize.pending()
    }
    
    /// True while a render is owed (e.g. after a skipped pass).
    pub fn needs_render(&self) -> bool {
        self.invalidated.any()
    }
    
    pub fn stats(&self) -> ViewerStats {
        self.stats
    }
    
    pub fn surface(&self) -> &S {
        &self.surface
    }
    
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
    
    pub fn into_surface(self) -> S {
        self.surface
    }
    
    // =========================================================================
    // INTERNALS
    // =========================================================================
    
    fn retarget(&mut self) {
        let bounds = bounds::compute(&self.bodies, &self.trails);
        self.invalidated.camera |= self.camera.set_target(bounds, self.viewport.width, self.viewport.height);
    }
    
    fn flush(&mut self) {
        if self.invalidated.any() {
            let fidelity = if self.resize.is_degraded() {
                Fidelity::Degraded
            } else {
                Fidelity::Full
            };
            self.render(fidelity);
        }
    }
    
    fn render(&mut self, fidelity: Fidelity) -> Option<RenderStats> {
        let frame = FrameView {
            camera: self.camera.state(),
            viewport: self.viewport,
            trails: &self.trails,
            bodies: &self.bodies,
        };
        
        match self.renderer.draw(&mut self.surface, &frame, fidelity) {
            Ok(stats) => {
                self.invalidated = Invalidation::default();
                self.stats.renders += 1;
                if stats.degraded() {
                    self.stats.degraded_renders += 1;
                }
                self.emit(ViewerEvent::Rendered(stats));
                Some(stats)
            }
            Err(e) => {
                // Keep the invalidation so the next frame tries again.
                self.invalidated.viewport = true;
                self.stats.skipped_renders += 1;
                debug!(error = %e, "render skipped");
                None
            }
        }
    }
    
    fn emit(&mut self, event: ViewerEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;
    use std::sync::{Arc, Mutex};
    
    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }
    
    fn body(id: BodyId, x: f64, y: f64) -> Body {
        Body {
            id,
            mass: 1.0,
            position: Vec2::new(x, y),
            velocity: Vec2::new(5.0, 0.0),
            radius: 10.0,
            color: "#ff9999".to_string(),
        }
    }
    
    fn viewer() -> Viewer<RecordingSurface> {
        Viewer::new(ViewerConfig::default(), RecordingSurface::new(), Viewport::new(800.0, 600.0, 1.0))
    }
    
    fn record(viewer: &mut Viewer<RecordingSurface>) -> Arc<Mutex<Vec<ViewerEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        viewer.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        events
    }
    
    fn renders(events: &Arc<Mutex<Vec<ViewerEvent>>>) -> Vec<RenderStats> {
        events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ViewerEvent::Rendered(stats) => Some(*stats),
                _ => None,
            })
            .collect()
    }
    
    #[test]
    fn test_snapshot_renders_and_retargets() {
        let mut v = viewer();
        let events = record(&mut v);
        v.on_snapshot(vec![body(1, 100.0, 100.0)]);
        
        assert_eq!(renders(&events).len(), 1);
        assert_eq!(v.camera().target_offset_x, -100.0);
        assert_eq!(v.camera().offset_x, 0.0);
    }
    
    #[test]
    fn test_camera_glides_without_new_snapshots() {
        let mut v = viewer();
        v.on_snapshot(vec![body(1, 100.0, 0.0)]);
        
        for _ in 0..10 {
            v.on_frame();
        }
        let expected = -100.0 * (1.0 - 0.9f64.powi(10));
        assert!((v.camera().offset_x - expected).abs() < 1e-9);
        assert_eq!(v.stats().snapshots, 1);
        assert_eq!(v.stats().frames, 10);
    }
    
    #[test]
    fn test_idle_frames_do_not_render() {
        let mut v = viewer();
        let events = record(&mut v);
        // Nothing to draw and camera at rest
        v.on_frame();
        v.on_frame();
        v.on_frame();
        
        // Only the initial pass for the fresh viewport
        assert_eq!(renders(&events).len(), 1);
    }
    
    #[test]
    fn test_empty_snapshot_keeps_target() {
        let mut v = viewer();
        v.on_snapshot(vec![body(1, 250.0, -40.0)]);
        let before = v.camera();
        
        v.on_snapshot(Vec::new());
        assert_eq!(v.camera().target_offset_x, before.target_offset_x);
        assert_eq!(v.camera().target_scale, before.target_scale);
        assert!(v.trails().is_empty());
    }
    
    #[test]
    fn test_click_selects_and_misses() {
        let mut v = viewer();
        let events = record(&mut v);
        v.on_snapshot(vec![body(1, 0.0, 0.0)]);
        
        let at = v.transform().to_screen(Vec2::ZERO);
        assert_eq!(v.click(at.x, at.y), ClickOutcome::Selected(Some(1)));
        assert_eq!(v.selection(), Some(1));
        
        assert_eq!(v.click(at.x + 1000.0, at.y), ClickOutcome::Selected(None));
        assert_eq!(v.selection(), None);
        
        let selections: Vec<ViewerEvent> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, ViewerEvent::Selection(_)))
            .cloned()
            .collect();
        assert_eq!(selections, vec![ViewerEvent::Selection(Some(1)), ViewerEvent::Selection(None)]);
    }
    
    #[test]
    fn test_resize_degrades_then_settles_with_one_full_render() {
        let mut v = viewer();
        let events = record(&mut v);
        for i in 0..100 {
            v.on_snapshot(vec![body(1, i as f64, 0.0)]);
        }
        for _ in 0..200 {
            v.on_frame();
        }
        events.lock().unwrap().clear();
        
        let ticket = v.on_resize(Viewport::new(1024.0, 768.0, 1.0), ms(0));
        let first = renders(&events);
        assert_eq!(first.len(), 1);
        assert!(first[0].degraded());
        assert!(first[0].max_stride > 1);
        assert_eq!(first[0].velocity_indicators, 0);
        
        // Still mid-burst: frames keep rendering degraded, no settle yet
        v.on_snapshot(vec![body(1, 100.0, 0.0)]);
        assert!(!v.poll_settle(ms(99)));
        assert!(renders(&events).iter().all(|r| r.degraded()));
        
        events.lock().unwrap().clear();
        assert_eq!(ticket.deadline, ms(100));
        assert!(v.poll_settle(ms(100)));
        
        let settled = renders(&events);
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].fidelity, Fidelity::Full);
        assert_eq!(settled[0].velocity_indicators, 1);
        assert_eq!(v.phase(), ResizePhase::Stable);
        assert!(events.lock().unwrap().contains(&ViewerEvent::Settled));
    }
    
    #[test]
    fn test_resize_burst_restarts_settle_timer() {
        let mut v = viewer();
        v.on_resize(Viewport::new(900.0, 600.0, 1.0), ms(0));
        v.on_resize(Viewport::new(1000.0, 600.0, 1.0), ms(50));
        let last = v.on_resize(Viewport::new(1100.0, 600.0, 1.0), ms(90));
        
        assert!(!v.poll_settle(ms(150)));
        assert_eq!(v.phase(), ResizePhase::Resizing);
        assert!(!v.on_settle(last.generation - 1));
        assert!(v.poll_settle(ms(190)));
        assert_eq!(v.phase(), ResizePhase::Stable);
    }
    
    #[test]
    fn test_resizing_suppresses_clicks_and_retarget() {
        let mut v = viewer();
        v.on_snapshot(vec![body(1, 0.0, 0.0)]);
        let at = v.transform().to_screen(Vec2::ZERO);
        v.click(at.x, at.y);
        
        v.on_resize(Viewport::new(400.0, 300.0, 1.0), ms(0));
        let target = v.camera();
        v.on_snapshot(vec![body(1, 500.0, 500.0)]);
        
        assert_eq!(v.camera().target_offset_x, target.target_offset_x);
        assert_eq!(v.click(0.0, 0.0), ClickOutcome::Ignored);
        assert_eq!(v.selection(), Some(1));
        
        // Trail now spans the old and new positions: x in [0, 510]
        v.poll_settle(ms(100));
        assert_eq!(v.camera().target_offset_x, -255.0);
    }
    
    #[test]
    fn test_reappearing_body_restarts_trail() {
        let mut v = viewer();
        for i in 0..5 {
            v.on_snapshot(vec![body(1, 0.0, 0.0), body(2, i as f64, 0.0)]);
        }
        v.on_snapshot(vec![body(1, 0.0, 0.0)]);
        v.on_snapshot(vec![body(1, 0.0, 0.0), body(2, 9.0, 0.0)]);
        
        assert_eq!(v.trails().get(2).map(|t| t.len()), Some(1));
        assert_eq!(v.trails().get(1).map(|t| t.len()), Some(7));
    }
    
    #[test]
    fn test_unavailable_surface_retries_next_frame() {
        let mut v = viewer();
        v.surface_mut().set_available(false);
        v.on_snapshot(vec![body(1, 0.0, 0.0)]);
        assert_eq!(v.stats().renders, 0);
        assert!(v.needs_render());
        
        v.surface_mut().set_available(true);
        v.on_frame();
        assert_eq!(v.stats().renders, 1);
        assert!(!v.needs_render());
        assert_eq!(v.stats().skipped_renders, 1);
    }
    
    #[test]
    fn test_base_scale_not_reapplied_every_frame() {
        let mut v = Viewer::new(ViewerConfig::default(), RecordingSurface::new(), Viewport::new(800.0, 600.0, 2.0));
        v.on_snapshot(vec![body(1, 300.0, 0.0)]);
        for _ in 0..30 {
            v.on_frame();
        }
        assert!(v.stats().renders > 10);
        assert_eq!(v.surface().base_scale_applications(), 1);
        assert_eq!(v.surface().backing(), (1600, 1200));
    }
}
