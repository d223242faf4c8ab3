//! Owned handles for spawned background tasks.

use crate::error::EnvError;
use tokio::task::JoinHandle;

/// Cancellation handle for a task spawned through a [`ViewContext`].
///
/// Dropping the handle cancels the task, so a recurring task can never
/// outlive the component that owns its handle.
///
/// [`ViewContext`]: crate::ViewContext
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Wraps a tokio join handle.
    pub fn new(name: impl Into<String>, join: JoinHandle<()>) -> Self {
        Self {
            name: name.into(),
            join: Some(join),
        }
    }
    
    /// Returns the task's name (for logging).
    pub fn name(&self) -> &str {
        &self.name
    }
    
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        if let Some(join) = &self.join {
            join.abort();
        }
    }
    
    /// Returns true once the task has completed or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |join| join.is_finished())
    }
    
    /// Waits for the task to finish.
    ///
    /// # Returns
    /// * `Ok(())` - The task ran to completion
    /// * `Err(EnvError::TaskCancelled)` - The task was cancelled first
    /// * `Err(EnvError::TaskPanicked)` - The task panicked
    pub async fn join(mut self) -> Result<(), EnvError> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        match join.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Err(EnvError::TaskCancelled(self.name.clone())),
            Err(_) => Err(EnvError::TaskPanicked(self.name.clone())),
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
