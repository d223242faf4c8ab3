//! Core environment context trait for the OrbitView viewer.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::task::TaskHandle;

/// The central interface for environment interaction.
///
/// This trait abstracts the clock and the task scheduler so that the viewer
/// session can run both against the real clock and against a virtual clock
/// driven by a deterministic harness.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time` and `tokio::spawn`
/// - **Simulation**: `SimContext` (in `orbitview_sim`) - virtual clock
#[async_trait]
pub trait ViewContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Used for settle-timer deadlines and frame bookkeeping.
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;
    
    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock
    async fn sleep(&self, duration: Duration);
    
    /// Spawns a background task and returns its cancellation handle.
    ///
    /// The task runs until it completes or the handle is cancelled/dropped.
    fn spawn<F>(&self, name: &str, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static;
}
