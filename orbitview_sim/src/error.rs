//! Error types for the simulation harness.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    
    #[error(transparent)]
    View(#[from] orbitview_core::ViewError),
    
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}
