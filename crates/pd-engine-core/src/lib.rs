//! pd-engine core - real-time Pure Data audio engine
//!
//! Bridges a block-based synthesis graph (Pure Data, 64-sample ticks) to an
//! audio device that asks for arbitrary frame counts on its own real-time
//! thread.

pub mod audio;
pub mod config;
pub mod engine;
pub mod graph;
pub mod types;

pub use types::*;
