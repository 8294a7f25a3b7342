//! Synthesis graphs
//!
//! A synthesis graph produces audio in whole 64-frame ticks and accepts
//! control messages addressed to named receivers. Two variants exist:
//!
//! - [`PdGraph`]: Pure Data through libpd (cargo feature `pd`)
//! - [`ReferenceToneGraph`]: a fixed sine tone, for running the output path
//!   without a patch engine
//!
//! The variant is picked at runtime from [`GraphKind`], so the block bridge
//! and the engine controller never branch on which one is installed.

mod error;
mod message;
#[cfg(feature = "pd")]
mod pd;
mod tone;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use error::{GraphError, GraphResult, RenderError};
pub use message::{ArgumentError, Atom, ControlMessage, MessageKind, PatchPath};
#[cfg(feature = "pd")]
pub use pd::PdGraph;
pub use tone::{ReferenceToneGraph, TONE_AMPLITUDE, TONE_FREQUENCY};

/// Capability the engine needs from a synthesis backend
///
/// All methods except [`render`](SynthesisGraph::render) run on the control
/// thread. `render` runs on the real-time thread and must not block, allocate
/// or log.
pub trait SynthesisGraph: Send {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Number of interleaved output channels produced per frame
    fn channels_out(&self) -> usize;

    /// Open a patch, replacing nothing: callers close the previous one first
    fn open_patch(&mut self, patch: &PatchPath) -> GraphResult<()>;

    /// Close the open patch; no-op if none is open
    fn close_patch(&mut self) -> GraphResult<()>;

    fn has_patch(&self) -> bool;

    /// Deliver one control message
    fn send(&mut self, message: &ControlMessage) -> GraphResult<()>;

    /// Render `ticks` ticks into `output`
    ///
    /// `output.len()` must equal `ticks * TICK_SIZE * channels_out()`.
    fn render(&mut self, ticks: usize, output: &mut [f32]) -> Result<(), RenderError>;

    /// Release engine resources before the graph is dropped
    fn shutdown(&mut self) {}
}

/// Which synthesis backend the engine creates at start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphKind {
    /// Pure Data via libpd
    Pd,
    /// Fixed sine tone (no patch engine)
    ReferenceTone,
}

impl Default for GraphKind {
    fn default() -> Self {
        if cfg!(feature = "pd") {
            GraphKind::Pd
        } else {
            GraphKind::ReferenceTone
        }
    }
}

/// Parameters a graph is created with, fixed for one Running session
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSettings {
    pub kind: GraphKind,
    pub sample_rate: u32,
    /// Effective block size in frames (a multiple of the tick size)
    pub block_size: u32,
    pub channels_out: u16,
    pub channels_in: u16,
    pub search_paths: Vec<PathBuf>,
}

/// Creates the synthesis graph for each `start()`
pub trait GraphFactory: Send {
    fn create(&self, settings: &GraphSettings) -> GraphResult<Box<dyn SynthesisGraph>>;
}

/// Factory that honors [`GraphSettings::kind`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGraphFactory;

impl GraphFactory for DefaultGraphFactory {
    fn create(&self, settings: &GraphSettings) -> GraphResult<Box<dyn SynthesisGraph>> {
        match settings.kind {
            GraphKind::ReferenceTone => Ok(Box::new(ReferenceToneGraph::new(
                settings.sample_rate,
                settings.channels_out,
            ))),
            #[cfg(feature = "pd")]
            GraphKind::Pd => Ok(Box::new(PdGraph::new(settings)?)),
            #[cfg(not(feature = "pd"))]
            GraphKind::Pd => Err(GraphError::InitializationFailed(
                "built without the `pd` feature".to_string(),
            )),
        }
    }
}
