//! Error types for the viewer.

use thiserror::Error;

/// Errors raised by a single render pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The drawable surface or its 2D context is not available right now.
    /// The pass is skipped and retried on the next frame.
    #[error("Surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

/// Errors raised by the viewer and its session driver.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Configuration could not be loaded or is invalid
    #[error("Config error: {0}")]
    Config(String),
    
    /// The session's owner task is gone
    #[error("Viewer session closed")]
    SessionClosed,
    
    #[error(transparent)]
    Render(#[from] RenderError),
    
    #[error(transparent)]
    Env(#[from] orbitview_env::EnvError),
}
