//! OrbitView Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the OrbitView viewer
//! to run against a **Production** clock (tokio) or a **Simulated** clock
//! (virtual time advanced by a test harness).
//!
//! # Core Concept: Owned Recurring Tasks
//!
//! Everything time-driven in the viewer goes through this crate:
//! - Time (`now()`, `sleep()`)
//! - Background work (`spawn()`), which always returns a [`TaskHandle`]
//!
//! A recurring task (e.g. the per-frame camera tick) is never a detached
//! closure. It is owned by whoever holds its handle, and it stops when the
//! handle is cancelled or dropped.
//!
//! # Example
//!
//! ```ignore
//! use orbitview_env::{ViewContext, TokioContext};
//!
//! let ctx = TokioContext::shared();
//! let ticker = ctx.spawn("frame-ticker", async move {
//!     loop {
//!         ctx2.sleep(Duration::from_millis(16)).await;
//!         tick();
//!     }
//! });
//!
//! // Teardown
//! ticker.cancel();
//! ```

mod context;
mod error;
mod task;
mod tokio_impl;

pub use context::ViewContext;
pub use error::EnvError;
pub use task::TaskHandle;
pub use tokio_impl::TokioContext;
