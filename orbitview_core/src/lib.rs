//! OrbitView Core - Auto-Framing Viewer for 2D N-Body Simulations
//!
//! Turns a stream of body snapshots into a framed, trail-annotated picture:
//! 1. **Framing**: [`bounds`] measures the scene, [`camera`] eases toward it
//! 2. **History**: [`trails`] keeps a bounded path per body
//! 3. **Resizes**: [`resize`] degrades rendering during a burst and restores
//!    it once the layout settles
//!
//! [`Viewer`] owns all of the above and is driven by explicit inputs;
//! [`ViewerSession`] runs it inside a task with a frame ticker.

pub mod bounds;
pub mod camera;
pub mod config;
pub mod error;
pub mod hit_test;
pub mod render;
pub mod resize;
pub mod session;
pub mod surface;
pub mod trails;
pub mod types;
pub mod viewer;

#[cfg(feature = "dashboard")]
pub mod dashboard;

// Re-export key types for convenience
pub use bounds::Bounds;
pub use camera::{CameraController, CameraState, CameraTransform, Viewport};
pub use config::{CameraConfig, RenderConfig, ViewerConfig, MAX_TRAIL_LENGTH};
pub use error::{RenderError, ViewError};
pub use render::{Fidelity, FrameView, RenderStats, Renderer};
pub use resize::{ResizeCoordinator, ResizePhase, SettleTicket};
pub use session::{SessionStatus, ViewerSession};
pub use surface::{BackingStore, DrawCommand, RecordingSurface, Surface};
pub use trails::{TrailRecord, TrailStore};
pub use types::{Body, BodyId, Rgb, Rgba, Vec2};
pub use viewer::{ClickOutcome, Viewer, ViewerEvent, ViewerStats};
