//! Scenario runner - drives physics and a viewer on a virtual clock.
//!
//! Each run follows the same script, scaled to its duration:
//! - 25%: click on the first body's on-screen position
//! - 40%: a burst of resizes, two frames apart, with a click in the middle
//! - 75%: click far outside every body
//!
//! and then checks what the viewer did against what it should have done.

use crate::context::SimContext;
use crate::exporter::{phase_name, BodyPosition, FrameSummary, SimExport};
use crate::physics::TIME_STEP;
use crate::scenarios::ScenarioId;

use orbitview_core::{
    Body, BodyId, ClickOutcome, RecordingSurface, RenderStats, ResizePhase, Vec2, Viewer,
    ViewerConfig, ViewerEvent, Viewport,
};
use crossbeam::channel;
use orbitview_env::ViewContext;
use tracing::{debug, info, warn};

const RESIZE_BURST: u64 = 6;
const RESIZE_SPACING_FRAMES: u64 = 2;
const MIN_FRAMES: u64 = 60;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Scenario that was run
    pub scenario: ScenarioId,
    
    /// Seed used
    pub seed: u64,
    
    /// Whether every check passed
    pub passed: bool,
    
    /// Display refreshes driven
    pub frames: u64,
    
    pub snapshots: u64,
    
    /// Render passes that reached the surface
    pub renders: u64,
    
    pub degraded_renders: u64,
    
    /// Resize bursts that settled
    pub settles: u64,
    
    /// Selection result of every accepted click, in order
    pub selections: Vec<Option<BodyId>>,
    
    /// Clicks dropped because a resize was in progress
    pub ignored_clicks: u64,
    
    pub final_scale: f64,
    
    /// Simulated physics time in seconds
    pub sim_time_secs: f64,
    
    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Runs viewer scenarios.
pub struct ViewerRunner {
    /// Configuration seed
    seed: u64,
    
    /// Run length in seconds of virtual time
    duration_secs: f64,
    
    config: ViewerConfig,
    
    /// Display frames between simulation snapshots
    snapshot_every: u64,
    
    #[cfg(feature = "dashboard")]
    feed: Option<channel::Sender<Vec<Body>>>,
}

impl ViewerRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            duration_secs: 10.0,
            config: ViewerConfig::default(),
            snapshot_every: 3,
            #[cfg(feature = "dashboard")]
            feed: None,
        }
    }
    
    /// Sets the run length.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }
    
    pub fn with_config(mut self, config: ViewerConfig) -> Self {
        self.config = config;
        self
    }
    
    /// Sets how many display frames pass between snapshots.
    pub fn with_snapshot_every(mut self, frames: u64) -> Self {
        self.snapshot_every = frames.max(1);
        self
    }
    
    /// Mirrors every snapshot to a terminal dashboard and paces the run in
    /// real time.
    #[cfg(feature = "dashboard")]
    pub fn with_feed(mut self, feed: channel::Sender<Vec<Body>>) -> Self {
        self.feed = Some(feed);
        self
    }
    
    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> RunReport {
        self.execute(scenario, None)
    }
    
    /// Runs a scenario, recording one frame summary per snapshot.
    pub fn run_with_export(&self, scenario: ScenarioId, export: &mut SimExport) -> RunReport {
        let report = self.execute(scenario, Some(export));
        export.finalize(report.passed, report.failure_reason.clone());
        report
    }
    
    fn execute(&self, scenario: ScenarioId, mut export: Option<&mut SimExport>) -> RunReport {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        
        let ctx = SimContext::new(self.seed);
        let setup = scenario.build(&ctx);
        let mut system = setup.system;
        system.set_running(true);
        
        let period = self.config.frame_period();
        let total_frames = ((self.duration_secs * self.config.frame_rate_hz as f64) as u64).max(MIN_FRAMES);
        let steps_per_snapshot =
            ((self.snapshot_every as f64 * period.as_secs_f64()) / TIME_STEP).round().max(1.0) as usize;
        
        let first_click = total_frames / 4;
        let burst_start = total_frames * 2 / 5;
        let burst_end = burst_start + RESIZE_BURST * RESIZE_SPACING_FRAMES;
        let burst_click = burst_start + RESIZE_BURST / 2 * RESIZE_SPACING_FRAMES + 1;
        let far_click = total_frames * 3 / 4;
        
        let (event_tx, event_rx) = channel::unbounded();
        let mut viewer = Viewer::new(self.config.clone(), RecordingSurface::new(), Viewport::default());
        viewer.subscribe(move |event| {
            let _ = event_tx.send(event.clone());
        });
        
        let mut report = RunReport {
            scenario,
            seed: self.seed,
            passed: false,
            frames: 0,
            snapshots: 0,
            renders: 0,
            degraded_renders: 0,
            settles: 0,
            selections: Vec::new(),
            ignored_clicks: 0,
            final_scale: 1.0,
            sim_time_secs: 0.0,
            failure_reason: None,
        };
        let mut failures: Vec<String> = Vec::new();
        let mut last_render: Option<RenderStats> = None;
        let mut target: Option<BodyId> = None;
        let mut snapshot_index = 0u64;
        let mut flicker_pending = false;
        
        for frame in 0..total_frames {
            ctx.advance_time(period);
            let now = ctx.now();
            
            // === SNAPSHOT ===
            if frame % self.snapshot_every == 0 {
                for _ in 0..steps_per_snapshot {
                    system.step();
                }
                let mut bodies = system.snapshot();
                if let Some(plan) = setup.flicker {
                    if plan.hidden_at(snapshot_index) {
                        bodies.retain(|b| b.id != plan.body);
                    }
                }
                #[cfg(feature = "dashboard")]
                self.publish(&bodies);
                viewer.on_snapshot(bodies);
                
                if let Some(plan) = setup.flicker {
                    let trail_len = viewer.trails().get(plan.body).map(|t| t.len());
                    if plan.hidden_at(snapshot_index) {
                        if trail_len.is_some() {
                            failures.push(format!("trail of body {} survived its absence", plan.body));
                        }
                        flicker_pending = true;
                    } else if flicker_pending {
                        if trail_len != Some(1) {
                            failures.push(format!(
                                "trail of body {} restarted with {:?} points",
                                plan.body, trail_len
                            ));
                        }
                        flicker_pending = false;
                    }
                }
                snapshot_index += 1;
            }
            
            // === RESIZE BURST ===
            if frame >= burst_start && frame < burst_end && (frame - burst_start) % RESIZE_SPACING_FRAMES == 0 {
                let step = ((frame - burst_start) / RESIZE_SPACING_FRAMES + 1) as f64;
                let viewport = Viewport::new(800.0 - 40.0 * step, 600.0 - 30.0 * step, 1.0);
                viewer.on_resize(viewport, now);
            }
            viewer.poll_settle(now);
            viewer.on_frame();
            
            // === CLICKS ===
            if frame == first_click {
                if let Some(body) = viewer.bodies().first() {
                    target = Some(body.id);
                    let point = viewer.transform().to_screen(body.position);
                    self.click(&mut viewer, point, &mut report);
                }
            }
            if frame == burst_click {
                let center = viewer.viewport().center();
                self.click(&mut viewer, center, &mut report);
            }
            if frame == far_click {
                let viewport = viewer.viewport();
                let point = Vec2::new(viewport.width + 1000.0, viewport.height + 1000.0);
                self.click(&mut viewer, point, &mut report);
            }
            
            for event in event_rx.try_iter() {
                match event {
                    ViewerEvent::Rendered(stats) => last_render = Some(stats),
                    ViewerEvent::Settled => report.settles += 1,
                    ViewerEvent::Selection(selected) => report.selections.push(selected),
                }
            }
            
            if let Some(export) = export.as_deref_mut() {
                if frame % self.snapshot_every == 0 {
                    export.add_frame(summarize(&viewer, system.elapsed_time(), last_render));
                }
            }
            
            if frame % 60 == 0 {
                debug!(
                    "  t={:.1}s | bodies={} | scale={:.3} | phase={}",
                    system.elapsed_time(),
                    viewer.bodies().len(),
                    viewer.camera().scale,
                    phase_name(viewer.phase())
                );
            }
            
            #[cfg(feature = "dashboard")]
            if self.feed.is_some() {
                std::thread::sleep(period);
            }
        }
        
        let stats = viewer.stats();
        report.frames = stats.frames;
        report.snapshots = stats.snapshots;
        report.renders = stats.renders;
        report.degraded_renders = stats.degraded_renders;
        report.final_scale = viewer.camera().scale;
        report.sim_time_secs = system.elapsed_time();
        
        // === CHECKS ===
        if report.selections.first().copied() != Some(target) {
            failures.push(format!(
                "click on body {:?} selected {:?}",
                target,
                report.selections.first()
            ));
        }
        if report.selections.get(1).copied() != Some(None) {
            failures.push("click far from every body selected something".to_string());
        }
        if report.ignored_clicks != 1 {
            failures.push(format!("{} clicks ignored during resize, expected 1", report.ignored_clicks));
        }
        if report.settles != 1 || viewer.phase() != ResizePhase::Stable {
            failures.push(format!("resize burst settled {} times", report.settles));
        }
        if report.degraded_renders == 0 {
            failures.push("no degraded render during resize".to_string());
        }
        let camera = self.config.camera;
        if report.final_scale < camera.min_zoom || report.final_scale > camera.max_zoom {
            failures.push(format!("zoom {} outside configured range", report.final_scale));
        }
        if viewer.trails().iter().any(|t| t.len() > self.config.max_trail_length) {
            failures.push("trail exceeded its maximum length".to_string());
        }
        
        report.passed = failures.is_empty();
        if !report.passed {
            for failure in &failures {
                warn!("{}: {}", scenario.name(), failure);
            }
            report.failure_reason = Some(failures.join("; "));
        }
        report
    }
    
    fn click(&self, viewer: &mut Viewer<RecordingSurface>, point: Vec2, report: &mut RunReport) {
        if viewer.click(point.x, point.y) == ClickOutcome::Ignored {
            report.ignored_clicks += 1;
        }
    }
    
    #[cfg(feature = "dashboard")]
    fn publish(&self, bodies: &[Body]) {
        if let Some(feed) = &self.feed {
            let _ = feed.send(bodies.to_vec());
        }
    }
}

fn summarize(
    viewer: &Viewer<RecordingSurface>,
    time_sec: f64,
    render: Option<RenderStats>,
) -> FrameSummary {
    let bodies = viewer
        .bodies()
        .iter()
        .map(|b: &Body| BodyPosition {
            id: b.id,
            x: b.position.x,
            y: b.position.y,
            trail_len: viewer.trails().get(b.id).map(|t| t.len()).unwrap_or(0),
        })
        .collect();
    
    FrameSummary {
        time_sec,
        camera: viewer.camera().into(),
        phase: phase_name(viewer.phase()).to_string(),
        render: render.map(Into::into),
        bodies,
        selection: viewer.selection(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_solar_run_passes() {
        let report = ViewerRunner::new(42).with_duration(3.0).run(ScenarioId::Solar);
        assert!(report.passed, "{:?}", report.failure_reason);
        assert_eq!(report.frames, 180);
        assert_eq!(report.snapshots, 60);
        assert_eq!(report.selections, vec![Some(1), None]);
        assert_eq!(report.settles, 1);
        assert!(report.degraded_renders >= RESIZE_BURST);
        // 60 snapshots of 5 steps at 0.01s
        assert!((report.sim_time_secs - 3.0).abs() < 1e-9);
    }
    
    #[test]
    fn test_flicker_run_recreates_trail() {
        let report = ViewerRunner::new(1).with_duration(2.0).run(ScenarioId::Flicker);
        assert!(report.passed, "{:?}", report.failure_reason);
    }
    
    #[test]
    fn test_cluster_runs_are_deterministic() {
        let a = ViewerRunner::new(5).with_duration(2.0).run(ScenarioId::Cluster);
        let b = ViewerRunner::new(5).with_duration(2.0).run(ScenarioId::Cluster);
        assert!(a.passed, "{:?}", a.failure_reason);
        assert_eq!(a.final_scale, b.final_scale);
        assert_eq!(a.renders, b.renders);
    }
    
    #[test]
    fn test_export_has_one_frame_per_snapshot() {
        let mut export = SimExport::new("solar", 3);
        let report = ViewerRunner::new(3)
            .with_duration(1.0)
            .run_with_export(ScenarioId::Solar, &mut export);
        
        assert_eq!(export.frames.len() as u64, report.snapshots);
        assert_eq!(export.passed, report.passed);
        assert!(export.frames.iter().any(|f| f.phase == "resizing"));
        assert!(export.frames.iter().all(|f| f.bodies.len() == 7));
    }
}
