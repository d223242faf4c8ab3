//! Async driver that owns a [`Viewer`] inside a single task.
//!
//! # Architecture
//!
//! ```text
//!  ViewerSession (handle)          owner task                 timers
//!  ──────────────────────        ───────────────            ──────────────
//!  push_snapshot ──┐                                       frame ticker
//!  resize ─────────┼── mpsc ──▶  Viewer (only owner) ◀──── (repeating, owned
//!  click ──────────┘              │                          TaskHandle)
//!                                 │ on_resize ──spawn──▶   settle timer
//!  selections() ◀── mpsc ─────────┘                         (one-shot; each
//!                                                            resize cancels
//!                                                            the previous)
//! ```
//!
//! All state lives in the owner task; everything else talks to it through
//! messages, so no locks are needed and each render sees one consistent
//! snapshot of camera, trails and bodies.

use std::sync::Arc;
use std::time::Duration;

use orbitview_env::{TaskHandle, ViewContext};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::camera::{CameraState, Viewport};
use crate::error::ViewError;
use crate::resize::{ResizePhase, SettleTicket};
use crate::surface::Surface;
use crate::types::{Body, BodyId};
use crate::viewer::{ClickOutcome, Viewer, ViewerEvent, ViewerStats};

/// Point-in-time view of the owner task's state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStatus {
    pub camera: CameraState,
    pub phase: ResizePhase,
    pub selection: Option<BodyId>,
    pub stats: ViewerStats,
}

enum ViewerInput<S: Surface> {
    Snapshot(Vec<Body>),
    Resize(Viewport),
    Click {
        x: f64,
        y: f64,
        reply: oneshot::Sender<ClickOutcome>,
    },
    Frame,
    Settle(u64),
    Status(oneshot::Sender<SessionStatus>),
    Shutdown(oneshot::Sender<Viewer<S>>),
}

/// Handle to a running viewer.
///
/// Dropping the handle cancels the owner task, which in turn drops (and so
/// cancels) the frame ticker and any pending settle timer. Use
/// [`ViewerSession::shutdown`] to get the viewer back.
pub struct ViewerSession<S: Surface + Send + 'static> {
    tx: mpsc::UnboundedSender<ViewerInput<S>>,
    owner: TaskHandle,
    selections: Option<mpsc::UnboundedReceiver<Option<BodyId>>>,
}

impl<S: Surface + Send + 'static> ViewerSession<S> {
    /// Spawns the owner task and its frame ticker on `ctx`.
    pub fn start<Ctx: ViewContext>(ctx: Arc<Ctx>, mut viewer: Viewer<S>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (selection_tx, selection_rx) = mpsc::unbounded_channel();
        
        viewer.subscribe(move |event| {
            if let ViewerEvent::Selection(selected) = event {
                let _ = selection_tx.send(*selected);
            }
        });
        
        let owner = ctx.spawn("viewer-owner", run_owner(Arc::clone(&ctx), viewer, rx, tx.clone()));
        
        Self {
            tx,
            owner,
            selections: Some(selection_rx),
        }
    }
    
    /// Takes the stream of selection results (once).
    pub fn selections(&mut self) -> Option<mpsc::UnboundedReceiver<Option<BodyId>>> {
        self.selections.take()
    }
    
    pub fn push_snapshot(&self, bodies: Vec<Body>) -> Result<(), ViewError> {
        self.send(ViewerInput::Snapshot(bodies))
    }
    
    pub fn resize(&self, viewport: Viewport) -> Result<(), ViewError> {
        self.send(ViewerInput::Resize(viewport))
    }
    
    pub async fn click(&self, x: f64, y: f64) -> Result<ClickOutcome, ViewError> {
        let (reply, rx) = oneshot::channel();
        self.send(ViewerInput::Click { x, y, reply })?;
        rx.await.map_err(|_| ViewError::SessionClosed)
    }
    
    pub async fn status(&self) -> Result<SessionStatus, ViewError> {
        let (reply, rx) = oneshot::channel();
        self.send(ViewerInput::Status(reply))?;
        rx.await.map_err(|_| ViewError::SessionClosed)
    }
    
    /// Stops the ticker and settle timer and returns the viewer.
    pub async fn shutdown(self) -> Result<Viewer<S>, ViewError> {
        let (reply, rx) = oneshot::channel();
        self.send(ViewerInput::Shutdown(reply))?;
        let viewer = rx.await.map_err(|_| ViewError::SessionClosed)?;
        self.owner.join().await?;
        Ok(viewer)
    }
    
    fn send(&self, command: ViewerInput<S>) -> Result<(), ViewError> {
        self.tx.send(command).map_err(|_| ViewError::SessionClosed)
    }
}

async fn run_owner<Ctx: ViewContext, S: Surface + Send + 'static>(
    ctx: Arc<Ctx>,
    mut viewer: Viewer<S>,
    mut rx: mpsc::UnboundedReceiver<ViewerInput<S>>,
    tx: mpsc::UnboundedSender<ViewerInput<S>>,
) {
    let period = viewer.config().frame_period();
    let ticker = spawn_ticker(&ctx, period, tx.clone());
    let mut settle: Option<TaskHandle> = None;
    info!(period_ms = period.as_secs_f64() * 1000.0, "viewer session started");
    
    while let Some(command) = rx.recv().await {
        match command {
            ViewerInput::Frame => viewer.on_frame(),
            ViewerInput::Snapshot(bodies) => viewer.on_snapshot(bodies),
            ViewerInput::Resize(viewport) => {
                let ticket = viewer.on_resize(viewport, ctx.now());
                if let Some(previous) = settle.take() {
                    previous.cancel();
                }
                settle = Some(spawn_settle_timer(&ctx, ticket, tx.clone()));
            }
            ViewerInput::Settle(generation) => {
                if viewer.on_settle(generation) {
                    settle = None;
                }
            }
            ViewerInput::Click { x, y, reply } => {
                let _ = reply.send(viewer.click(x, y));
            }
            ViewerInput::Status(reply) => {
                let _ = reply.send(SessionStatus {
                    camera: viewer.camera(),
                    phase: viewer.phase(),
                    selection: viewer.selection(),
                    stats: viewer.stats(),
                });
            }
            ViewerInput::Shutdown(reply) => {
                ticker.cancel();
                if let Some(pending) = settle.take() {
                    pending.cancel();
                }
                info!(frames = viewer.stats().frames, "viewer session stopped");
                let _ = reply.send(viewer);
                return;
            }
        }
    }
}

/// Repeating frame task: sleeps one period, posts a frame, repeats until
/// cancelled or the owner is gone.
fn spawn_ticker<Ctx: ViewContext, S: Surface + Send + 'static>(
    ctx: &Arc<Ctx>,
    period: Duration,
    tx: mpsc::UnboundedSender<ViewerInput<S>>,
) -> TaskHandle {
    let clock = Arc::clone(ctx);
    ctx.spawn("frame-ticker", async move {
        loop {
            clock.sleep(period).await;
            if tx.send(ViewerInput::Frame).is_err() {
                break;
            }
        }
    })
}

fn spawn_settle_timer<Ctx: ViewContext, S: Surface + Send + 'static>(
    ctx: &Arc<Ctx>,
    ticket: SettleTicket,
    tx: mpsc::UnboundedSender<ViewerInput<S>>,
) -> TaskHandle {
    let clock = Arc::clone(ctx);
    debug!(generation = ticket.generation, "settle timer armed");
    ctx.spawn("settle-timer", async move {
        clock.sleep(ticket.delay).await;
        let _ = tx.send(ViewerInput::Settle(ticket.generation));
    })
}
