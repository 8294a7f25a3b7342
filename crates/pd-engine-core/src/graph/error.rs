//! Error types for synthesis graphs
//!
//! Covers graph initialization, patch loading and message delivery. Render
//! failures have their own small type because they never leave the
//! real-time thread.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving a synthesis graph from the control thread
#[derive(Debug, Error)]
pub enum GraphError {
    /// Failed to initialize the synthesis engine
    #[error("Failed to initialize synthesis graph: {0}")]
    InitializationFailed(String),

    /// Failed to configure the engine's audio I/O
    #[error("Failed to configure audio: {channels} channels @ {sample_rate}Hz - {reason}")]
    AudioConfigFailed {
        channels: u16,
        sample_rate: u32,
        reason: String,
    },

    /// Patch file not found
    #[error("Patch file not found: {0}")]
    PatchNotFound(PathBuf),

    /// Failed to open a patch file
    #[error("Failed to open patch '{path}': {reason}")]
    PatchOpenFailed { path: PathBuf, reason: String },

    /// Failed to close a patch
    #[error("Failed to close patch: {0}")]
    PatchCloseFailed(String),

    /// Failed to deliver a message to a receiver
    #[error("Failed to send {msg_type} to receiver '{receiver}': {reason}")]
    SendFailed {
        msg_type: &'static str,
        receiver: String,
        reason: String,
    },
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// A synthesis step failed inside the render callback
///
/// Carries no allocation so it can be created on the real-time thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The graph is not in a state where it can produce audio
    #[error("synthesis graph is not ready to render")]
    NotReady,

    /// The output slice does not match the requested tick count
    #[error("render buffer holds {actual} samples, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::PatchNotFound(PathBuf::from("/foo/bar.pd"));
        assert!(err.to_string().contains("/foo/bar.pd"));

        let err = GraphError::SendFailed {
            msg_type: "float",
            receiver: "freq".to_string(),
            reason: "no such receiver".to_string(),
        };
        assert!(err.to_string().contains("'freq'"));

        let err = RenderError::BufferMismatch {
            expected: 128,
            actual: 64,
        };
        assert!(err.to_string().contains("128"));
    }
}
