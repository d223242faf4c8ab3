//! OrbitView Simulation Harness
//!
//! Drives the viewer with a real n-body simulation on a virtual clock, so a
//! whole session (snapshots, frames, resize bursts, clicks) replays the same
//! way every time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      ViewerRunner                        │
//! │  ┌──────────────┐  snapshots   ┌──────────────────────┐  │
//! │  │ NBodySystem  │─────────────►│ Viewer               │  │
//! │  │ (physics)    │              │ (RecordingSurface)   │  │
//! │  └──────────────┘              └──────────┬───────────┘  │
//! │         ▲                                 │ events       │
//! │         │ seed                            ▼              │
//! │  ┌──────┴───────┐              ┌──────────────────────┐  │
//! │  │ SimContext   │─ clock ─────►│ RunReport / SimExport│  │
//! │  └──────────────┘              └──────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use orbitview_sim::{ViewerRunner, scenarios::ScenarioId};
//!
//! let report = ViewerRunner::new(42).with_duration(5.0).run(ScenarioId::Solar);
//! assert!(report.passed);
//! ```

mod context;
mod error;
pub mod exporter;
pub mod physics;
pub mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{FrameSummary, SimExport};
pub use physics::{BodyPatch, NBodySystem};
pub use runner::{RunReport, ViewerRunner};
