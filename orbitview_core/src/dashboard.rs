//! OrbitView TUI Dashboard Module
//! ==============================
//!
//! Live terminal front end for a [`Viewer`]. [`TerminalSurface`] is a
//! [`Surface`] that flattens each rendered frame into shapes, painted on a
//! Ratatui canvas where one terminal cell counts as one CSS pixel. Body
//! snapshots arrive over a Crossbeam channel from the simulation thread.
//!
//! Enable with the `dashboard` feature flag.

use std::io;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, TryRecvError};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseButton, MouseEventKind},
    execute,
    terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nalgebra::{Matrix3, Vector3};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Line as CanvasLine},
        Block, Borders, Paragraph,
    },
    Frame, Terminal,
};
use tracing::info;

use crate::camera::Viewport;
use crate::config::ViewerConfig;
use crate::error::RenderError;
use crate::resize::ResizePhase;
use crate::surface::Surface;
use crate::types::{Body, Rgba, Vec2};
use crate::viewer::{Viewer, ViewerEvent};

// =============================================================================
// SCENE (Surface output in CSS pixels)
// =============================================================================

/// One primitive of a flattened frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line { from: Vec2, to: Vec2, color: Rgba },
    Circle { center: Vec2, radius: f64, color: Rgba },
    Label { anchor: Vec2, text: String, color: Rgba },
}

/// Surface that keeps the last completed frame as a list of shapes.
#[derive(Debug, Clone)]
pub struct TerminalSurface {
    transform: Matrix3<f64>,
    backing: (u32, u32),
    base_scale: f64,
    pending: Vec<Shape>,
    last_frame: Vec<Shape>,
    frames: u64,
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            transform: Matrix3::identity(),
            backing: (0, 0),
            base_scale: 1.0,
            pending: Vec::new(),
            last_frame: Vec::new(),
            frames: 0,
        }
    }
    
    /// Shapes of the most recent frame that reached `end_frame`.
    pub fn last_frame(&self) -> &[Shape] {
        &self.last_frame
    }
    
    pub fn frames(&self) -> u64 {
        self.frames
    }
    
    /// Backing buffer size divided back into CSS pixels.
    pub fn css_size(&self) -> (f64, f64) {
        (
            self.backing.0 as f64 / self.base_scale,
            self.backing.1 as f64 / self.base_scale,
        )
    }
    
    fn project(&self, p: Vec2) -> Vec2 {
        let v = self.transform * Vector3::new(p.x, p.y, 1.0);
        Vec2::new(v.x, v.y)
    }
    
    fn scale(&self) -> f64 {
        self.transform[(0, 0)].abs()
    }
}

impl Surface for TerminalSurface {
    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.pending.clear();
        Ok(())
    }
    
    fn resize_backing(&mut self, width: u32, height: u32) {
        self.backing = (width, height);
    }
    
    fn set_base_scale(&mut self, scale: f64) {
        self.base_scale = if scale > 0.0 { scale } else { 1.0 };
    }
    
    fn set_transform(&mut self, transform: Matrix3<f64>) {
        self.transform = transform;
    }
    
    fn clear(&mut self, _width: f64, _height: f64) {
        self.pending.clear();
    }
    
    fn stroke_line(&mut self, from: Vec2, to: Vec2, color: Rgba, _width: f64) {
        let shape = Shape::Line {
            from: self.project(from),
            to: self.project(to),
            color,
        };
        self.pending.push(shape);
    }
    
    fn fill_circle(&mut self, center: Vec2, radius: f64, color: Rgba) {
        let shape = Shape::Circle {
            center: self.project(center),
            radius: radius * self.scale(),
            color,
        };
        self.pending.push(shape);
    }
    
    fn fill_text(&mut self, text: &str, anchor: Vec2, _font_size: f64, color: Rgba) {
        let shape = Shape::Label {
            anchor: self.project(anchor),
            text: text.to_string(),
            color,
        };
        self.pending.push(shape);
    }
    
    fn end_frame(&mut self) {
        self.last_frame = std::mem::take(&mut self.pending);
        self.frames += 1;
    }
}

/// Blends `color` over the black terminal background.
pub fn terminal_color(color: Rgba) -> Color {
    let a = color.a.clamp(0.0, 1.0);
    let blend = |c: u8| (c as f64 * a).round() as u8;
    Color::Rgb(blend(color.r), blend(color.g), blend(color.b))
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// Splits the terminal into header, scene and footer rows.
fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Min(3),     // Scene
            Constraint::Length(1),  // Footer
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

fn scene_block() -> Block<'static> {
    Block::default().title("Scene").borders(Borders::ALL)
}

/// Drawable part of the scene for a terminal of `cols` x `rows` cells.
fn scene_inner(cols: u16, rows: u16) -> Rect {
    let (_, scene, _) = layout(Rect::new(0, 0, cols, rows));
    scene_block().inner(scene)
}

/// Terminal dashboard owning a viewer fed from the simulation thread.
pub struct Dashboard {
    rx: Receiver<Vec<Body>>,
    viewer: Viewer<TerminalSurface>,
    started: Instant,
    scene: Rect,
    sender_gone: bool,
}

impl Dashboard {
    /// Creates a dashboard for a terminal of `cols` x `rows` cells.
    pub fn new(rx: Receiver<Vec<Body>>, config: ViewerConfig, cols: u16, rows: u16) -> Self {
        let scene = scene_inner(cols, rows);
        let mut viewer = Viewer::new(config, TerminalSurface::new(), Self::viewport_for(scene));
        viewer.subscribe(|event| {
            if let ViewerEvent::Selection(selected) = event {
                info!(?selected, "selection");
            }
        });
        Self {
            rx,
            viewer,
            started: Instant::now(),
            scene,
            sender_gone: false,
        }
    }
    
    fn viewport_for(scene: Rect) -> Viewport {
        Viewport::new(scene.width.max(1) as f64, scene.height.max(1) as f64, 1.0)
    }
    
    pub fn viewer(&self) -> &Viewer<TerminalSurface> {
        &self.viewer
    }
    
    /// Feeds every snapshot waiting on the channel to the viewer.
    pub fn ingest(&mut self) -> usize {
        let mut received = 0;
        loop {
            match self.rx.try_recv() {
                Ok(bodies) => {
                    self.viewer.on_snapshot(bodies);
                    received += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.sender_gone = true;
                    break;
                }
            }
        }
        received
    }
    
    /// One display refresh at `now` since start: settle check and camera tick.
    pub fn tick(&mut self, now: Duration) {
        self.viewer.poll_settle(now);
        self.viewer.on_frame();
    }
    
    /// Applies one terminal event. Returns true when the user asked to quit.
    pub fn handle_event(&mut self, event: Event, now: Duration) -> bool {
        match event {
            Event::Key(key) => matches!(key.code, KeyCode::Char('q') | KeyCode::Esc),
            Event::Resize(cols, rows) => {
                self.scene = scene_inner(cols, rows);
                self.viewer.on_resize(Self::viewport_for(self.scene), now);
                false
            }
            Event::Mouse(mouse) => {
                if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                    let x = mouse.column as f64 - self.scene.x as f64;
                    let y = mouse.row as f64 - self.scene.y as f64;
                    self.viewer.click(x, y);
                }
                false
            }
            _ => false,
        }
    }
    
    /// Run the TUI main loop (blocks until 'q' pressed)
    ///
    /// The terminal is restored even when the loop fails.
    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = match Terminal::new(backend) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
                return Err(e);
            }
        };
        
        let result = self.event_loop(&mut terminal, |timeout| {
            if event::poll(timeout)? {
                event::read().map(Some)
            } else {
                Ok(None)
            }
        });
        
        let restored = restore_terminal(&mut terminal);
        result.and(restored)
    }
    
    /// Draws and dispatches events until quit or the first I/O error.
    fn event_loop<B, F>(&mut self, terminal: &mut Terminal<B>, mut next_event: F) -> io::Result<()>
    where
        B: Backend,
        F: FnMut(Duration) -> io::Result<Option<Event>>,
    {
        let period = self.viewer.config().frame_period();
        loop {
            self.ingest();
            self.tick(self.started.elapsed());
            terminal.draw(|f| self.ui(f))?;
            
            if let Some(event) = next_event(period)? {
                if self.handle_event(event, self.started.elapsed()) {
                    return Ok(());
                }
            }
        }
    }
    
    fn ui(&self, f: &mut Frame) {
        let (header_area, scene_area, footer_area) = layout(f.area());
        let stats = self.viewer.stats();
        let camera = self.viewer.camera();
        
        let (mode_text, mode_color) = match self.viewer.phase() {
            ResizePhase::Resizing => ("DEGRADED", Color::Yellow),
            ResizePhase::Stable => ("FULL", Color::Green),
        };
        let selection = self
            .viewer
            .selection()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        
        // === HEADER ===
        let header = Paragraph::new(Line::from(vec![
            Span::styled("OrbitView", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  |  "),
            Span::styled(mode_text, Style::default().fg(mode_color)),
            Span::raw("  |  "),
            Span::styled(format!("zoom {:.2}", camera.scale), Style::default().fg(Color::Cyan)),
            Span::raw("  |  "),
            Span::raw(format!("bodies {}  selected {}", self.viewer.bodies().len(), selection)),
            Span::raw("  |  "),
            Span::raw(format!("renders {} ({} degraded)", stats.renders, stats.degraded_renders)),
        ]))
        .block(Block::default().borders(Borders::BOTTOM));
        f.render_widget(header, header_area);
        
        // === SCENE ===
        let viewport = self.viewer.viewport();
        let shapes = self.viewer.surface().last_frame();
        // Canvas y grows upward; screen y grows downward.
        let canvas = Canvas::default()
            .block(scene_block())
            .marker(Marker::Braille)
            .x_bounds([0.0, viewport.width])
            .y_bounds([-viewport.height, 0.0])
            .paint(|ctx| {
                for shape in shapes {
                    match shape {
                        Shape::Line { from, to, color } => ctx.draw(&CanvasLine {
                            x1: from.x,
                            y1: -from.y,
                            x2: to.x,
                            y2: -to.y,
                            color: terminal_color(*color),
                        }),
                        Shape::Circle { center, radius, color } => ctx.draw(&Circle {
                            x: center.x,
                            y: -center.y,
                            radius: *radius,
                            color: terminal_color(*color),
                        }),
                        Shape::Label { anchor, text, color } => ctx.print(
                            anchor.x,
                            -anchor.y,
                            Span::styled(text.clone(), Style::default().fg(terminal_color(*color))),
                        ),
                    }
                }
            });
        f.render_widget(canvas, scene_area);
        
        // === FOOTER ===
        let status = if self.sender_gone {
            "simulation finished  |  press 'q' to quit"
        } else {
            "click a body to select  |  press 'q' to quit"
        };
        let footer = Paragraph::new(status)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(footer, footer_area);
    }
}

/// Runs a dashboard on the current terminal until the user quits.
pub fn run_dashboard(rx: Receiver<Vec<Body>>, config: ViewerConfig) -> io::Result<()> {
    let (cols, rows) = terminal::size()?;
    Dashboard::new(rx, config, cols, rows).run()
}

// =============================================================================
// TESTS
// =============================================================================

/// Leaves raw mode and the alternate screen. Every step runs; the first
/// failure is reported.
fn restore_terminal<B: Backend + io::Write>(terminal: &mut Terminal<B>) -> io::Result<()> {
    let raw = disable_raw_mode();
    let screen = execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture);
    let cursor = terminal.show_cursor();
    raw.and(screen).and(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraState;
    use crate::config::RenderConfig;
    use crate::render::{Fidelity, FrameView, Renderer};
    use crate::trails::TrailStore;
    use approx::assert_relative_eq;
    use crossterm::event::{KeyEvent, KeyModifiers, MouseEvent};
    use ratatui::backend::TestBackend;
    
    #[test]
    fn test_terminal_surface_projects_into_css_pixels() {
        let mut surface = TerminalSurface::new();
        let camera = CameraState {
            scale: 2.0,
            ..CameraState::default()
        };
        let trails = TrailStore::default();
        let bodies = vec![Body::at_rest(1, Vec2::new(10.0, 0.0), 5.0, "#ff0000")];
        let frame = FrameView {
            camera,
            viewport: Viewport::new(800.0, 600.0, 2.0),
            trails: &trails,
            bodies: &bodies,
        };
        
        Renderer::new(RenderConfig::default())
            .draw(&mut surface, &frame, Fidelity::Full)
            .unwrap();
        
        assert_eq!(surface.frames(), 1);
        assert_eq!(surface.css_size(), (800.0, 600.0));
        let circle = surface
            .last_frame()
            .iter()
            .find_map(|shape| match shape {
                Shape::Circle { center, radius, .. } => Some((*center, *radius)),
                _ => None,
            })
            .unwrap();
        assert_relative_eq!(circle.0.x, 420.0);
        assert_relative_eq!(circle.0.y, 300.0);
        assert_relative_eq!(circle.1, 10.0);
    }
    
    #[test]
    fn test_terminal_color_blends_toward_black() {
        assert_eq!(terminal_color(Rgba { r: 200, g: 100, b: 0, a: 0.5 }), Color::Rgb(100, 50, 0));
        assert_eq!(terminal_color(Rgba { r: 10, g: 20, b: 30, a: 1.0 }), Color::Rgb(10, 20, 30));
    }
    
    #[test]
    fn test_events_drive_the_viewer() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let mut dashboard = Dashboard::new(rx, ViewerConfig::default(), 82, 44);
        let scene = dashboard.scene;
        assert_eq!((scene.x, scene.y, scene.width, scene.height), (1, 4, 80, 38));
        
        tx.send(vec![Body::at_rest(3, Vec2::ZERO, 2.0, "#ffffff")]).unwrap();
        assert_eq!(dashboard.ingest(), 1);
        
        // Camera has not ticked yet, so sim origin sits at the scene center
        let click = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 41,
            row: 23,
            modifiers: KeyModifiers::NONE,
        });
        assert!(!dashboard.handle_event(click, Duration::ZERO));
        assert_eq!(dashboard.viewer().selection(), Some(3));
        
        assert!(!dashboard.handle_event(Event::Resize(100, 50), Duration::from_millis(10)));
        assert_eq!(dashboard.viewer().phase(), ResizePhase::Resizing);
        dashboard.tick(Duration::from_millis(50));
        assert_eq!(dashboard.viewer().phase(), ResizePhase::Resizing);
        dashboard.tick(Duration::from_millis(120));
        assert_eq!(dashboard.viewer().phase(), ResizePhase::Stable);
        assert!(dashboard.viewer().surface().frames() > 0);
        
        drop(tx);
        dashboard.ingest();
        assert!(dashboard.sender_gone);
        
        let quit = Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(dashboard.handle_event(quit, Duration::from_millis(130)));
    }
    
    #[test]
    fn test_event_loop_stops_on_quit_key() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let mut dashboard = Dashboard::new(rx, ViewerConfig::default(), 82, 44);
        let mut terminal = Terminal::new(TestBackend::new(82, 44)).unwrap();
        tx.send(vec![Body::at_rest(1, Vec2::ZERO, 2.0, "#ffffff")]).unwrap();
        
        let mut script = vec![
            None,
            Some(Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE))),
        ]
        .into_iter();
        let mut polls = 0;
        let result = dashboard.event_loop(&mut terminal, |_| {
            polls += 1;
            Ok(script.next().flatten())
        });
        
        assert!(result.is_ok());
        assert_eq!(polls, 2);
        assert_eq!(dashboard.viewer().bodies().len(), 1);
    }
    
    #[test]
    fn test_event_loop_returns_io_errors_to_caller() {
        let (_tx, rx) = crossbeam::channel::unbounded();
        let mut dashboard = Dashboard::new(rx, ViewerConfig::default(), 82, 44);
        let mut terminal = Terminal::new(TestBackend::new(82, 44)).unwrap();
        
        let result = dashboard.event_loop(&mut terminal, |_| {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "tty gone"))
        });
        
        // Control comes back to run(), which restores the terminal
        let err = result.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
