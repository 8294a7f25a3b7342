//! ReferenceToneGraph - deterministic sine used when no patch engine runs

use std::f64::consts::TAU;

use crate::TICK_SIZE;

use super::error::{GraphError, GraphResult, RenderError};
use super::message::{ControlMessage, PatchPath};
use super::SynthesisGraph;

/// Frequency of the reference tone (A4)
pub const TONE_FREQUENCY: f64 = 440.0;

/// Peak amplitude of the reference tone
pub const TONE_AMPLITUDE: f32 = 0.1;

/// Single sinusoid written identically to every output channel
///
/// Accepts patches and messages so the control surface behaves the same as
/// with Pure Data, but neither changes the sound.
pub struct ReferenceToneGraph {
    channels: usize,
    phase: f64,
    phase_increment: f64,
    patch: Option<PatchPath>,
}

impl ReferenceToneGraph {
    pub fn new(sample_rate: u32, channels_out: u16) -> Self {
        log::info!(
            "Reference tone graph: {}Hz sine, {} channels @ {}Hz",
            TONE_FREQUENCY,
            channels_out,
            sample_rate
        );
        Self {
            channels: channels_out.max(1) as usize,
            phase: 0.0,
            phase_increment: TAU * TONE_FREQUENCY / sample_rate.max(1) as f64,
            patch: None,
        }
    }

    /// Current oscillator phase in radians, in [0, 2π)
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl SynthesisGraph for ReferenceToneGraph {
    fn name(&self) -> &'static str {
        "reference-tone"
    }

    fn channels_out(&self) -> usize {
        self.channels
    }

    fn open_patch(&mut self, patch: &PatchPath) -> GraphResult<()> {
        let path = patch.full_path();
        if !path.is_file() {
            return Err(GraphError::PatchNotFound(path));
        }
        log::info!("Reference tone: accepted patch {} (not interpreted)", patch);
        self.patch = Some(patch.clone());
        Ok(())
    }

    fn close_patch(&mut self) -> GraphResult<()> {
        self.patch = None;
        Ok(())
    }

    fn has_patch(&self) -> bool {
        self.patch.is_some()
    }

    fn send(&mut self, _message: &ControlMessage) -> GraphResult<()> {
        Ok(())
    }

    fn render(&mut self, ticks: usize, output: &mut [f32]) -> Result<(), RenderError> {
        let expected = ticks * TICK_SIZE * self.channels;
        if output.len() != expected {
            return Err(RenderError::BufferMismatch {
                expected,
                actual: output.len(),
            });
        }

        for frame in output.chunks_exact_mut(self.channels) {
            let value = (self.phase.sin() as f32) * TONE_AMPLITUDE;
            frame.fill(value);
            self.phase += self.phase_increment;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }
        Ok(())
    }
}
