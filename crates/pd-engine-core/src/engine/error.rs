//! Errors surfaced by the engine controller
//!
//! Every control-thread operation fails fast with one of these. Failures on
//! the real-time thread never become an `EngineError`: they are turned into
//! silence and counted in [`RenderStats`](super::RenderStats).

use thiserror::Error;

use crate::audio::AudioError;
use crate::graph::{ArgumentError, GraphError};

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The output device could not be opened or started; the engine stays stopped
    #[error("Failed to start audio device: {0}")]
    DeviceInit(#[from] AudioError),

    /// The synthesis graph could not be created; the engine stays stopped
    #[error("Failed to initialize synthesis graph: {0}")]
    GraphInit(#[source] GraphError),

    /// The graph could not load the patch; no patch is retained
    #[error("Failed to load patch '{path}': {source}")]
    PatchLoad {
        path: String,
        #[source]
        source: GraphError,
    },

    /// Malformed call arguments; the call had no effect
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ArgumentError> for EngineError {
    fn from(err: ArgumentError) -> Self {
        EngineError::InvalidArgument(err.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
