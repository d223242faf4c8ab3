//! Error types for the OrbitView environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The task was cancelled through its handle
    #[error("Task cancelled: {0}")]
    TaskCancelled(String),
    
    /// The task panicked while running
    #[error("Task panicked: {0}")]
    TaskPanicked(String),
}
