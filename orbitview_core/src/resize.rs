//! Resize debouncing.
//!
//! ```text
//!            resize                     resize (restart settle timer)
//!  Stable ───────────▶ Resizing ◀───────────────┐
//!    ▲                    │  └──────────────────┘
//!    └────────────────────┘
//!        settle timer fired (current generation only)
//! ```
//!
//! The coordinator does no I/O. Every resize hands back a [`SettleTicket`];
//! the driver schedules one timer for it and cancels the previous one. A timer
//! that fires for an outdated generation is ignored.

use std::time::Duration;

use tracing::debug;

/// Phase of the resize state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizePhase {
    #[default]
    Stable,
    Resizing,
}

/// The settle timer that a driver must (re)schedule after a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTicket {
    pub generation: u64,
    /// How long to wait before firing
    pub delay: Duration,
    /// Absolute deadline on the driver's clock
    pub deadline: Duration,
}

/// Debounces resize events and tracks degraded rendering.
#[derive(Debug, Clone)]
pub struct ResizeCoordinator {
    phase: ResizePhase,
    settle_delay: Duration,
    generation: u64,
    pending: Option<SettleTicket>,
}

impl ResizeCoordinator {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            phase: ResizePhase::Stable,
            settle_delay,
            generation: 0,
            pending: None,
        }
    }
    
    pub fn phase(&self) -> ResizePhase {
        self.phase
    }
    
    /// Degraded rendering is on for the whole `Resizing` phase.
    pub fn is_degraded(&self) -> bool {
        self.phase == ResizePhase::Resizing
    }
    
    /// The single outstanding settle timer, if any.
    pub fn pending(&self) -> Option<SettleTicket> {
        self.pending
    }
    
    /// Handles a resize event observed at `now`.
    ///
    /// Enters (or stays in) `Resizing` and replaces the outstanding settle
    /// timer with a fresh one.
    pub fn on_resize(&mut self, now: Duration) -> SettleTicket {
        if self.phase == ResizePhase::Stable {
            debug!("resize started, entering degraded mode");
        }
        self.phase = ResizePhase::Resizing;
        self.generation += 1;
        
        let ticket = SettleTicket {
            generation: self.generation,
            delay: self.settle_delay,
            deadline: now + self.settle_delay,
        };
        self.pending = Some(ticket);
        ticket
    }
    
    /// Handles a settle timer firing.
    ///
    /// Returns true if this moved the machine back to `Stable`. Timers from
    /// superseded generations are ignored.
    pub fn settle(&mut self, generation: u64) -> bool {
        match self.pending {
            Some(ticket) if ticket.generation == generation => {
                self.pending = None;
                self.phase = ResizePhase::Stable;
                debug!(generation, "resize settled");
                true
            }
            _ => false,
        }
    }
    
    /// Fires the pending timer if its deadline has passed.
    ///
    /// For drivers that poll a clock instead of spawning timer tasks.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.pending {
            Some(ticket) if now >= ticket.deadline => self.settle(ticket.generation),
            _ => false,
        }
    }
}

impl Default for ResizeCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}
