//! BlockBridge - fixed 64-frame ticks in, arbitrary hardware periods out
//!
//! The synthesis graph only renders whole ticks while the device asks for
//! whatever frame count suits it. The bridge renders just enough ticks to
//! cover each request and keeps the surplus for the next callback, so no
//! synthesized sample is ever discarded:
//!
//! ```text
//! callback 1 (100 frames): render 2 ticks (128) → out 100, carry 28
//! callback 2 (100 frames): carry 28 → render 2 ticks (128) → out 72, carry 56
//! callback 3 (100 frames): carry 56 → render 1 tick  (64)  → out 44, carry 20
//! ```
//!
//! All buffers are sized at construction; `render` never allocates.

use std::ops::Range;

use crate::graph::SynthesisGraph;
use crate::{sanitize_sample, TICK_SIZE};

/// What happened during one callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// Output filled from the graph (and/or carry-over)
    Rendered,
    /// The graph failed; output is silence
    Silenced,
}

pub struct BlockBridge {
    channels: usize,
    /// Most ticks rendered in one graph call (block size / tick size)
    max_ticks: usize,
    gain: f32,
    /// Rendered, interleaved samples; `pending` marks what is not yet played
    scratch: Vec<f32>,
    pending: Range<usize>,
}

impl BlockBridge {
    /// Create a bridge for `channels` interleaved channels
    ///
    /// `block_size` is the effective (tick-aligned) block size and bounds how
    /// much is rendered per graph call.
    pub fn new(channels: usize, block_size: usize, gain: f32) -> Self {
        let channels = channels.max(1);
        let max_ticks = (block_size / TICK_SIZE).max(1);
        Self {
            channels,
            max_ticks,
            gain,
            scratch: vec![0.0; max_ticks * TICK_SIZE * channels],
            pending: 0..0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames rendered but not yet delivered
    pub fn carried_frames(&self) -> usize {
        self.pending.len() / self.channels
    }

    /// Fill `output` (interleaved, `frames * channels` samples) from `graph`
    ///
    /// Carry-over is served first, then whole ticks are rendered as needed.
    /// On a graph failure the entire output is silenced and the carry-over
    /// dropped.
    pub fn render(&mut self, graph: &mut dyn SynthesisGraph, output: &mut [f32]) -> BridgeOutcome {
        let usable = output.len() - output.len() % self.channels;
        output[usable..].fill(0.0);

        let mut written = 0;
        while written < usable {
            if self.pending.is_empty() {
                let remaining_frames = (usable - written) / self.channels;
                let ticks = remaining_frames.div_ceil(TICK_SIZE).clamp(1, self.max_ticks);
                let len = ticks * TICK_SIZE * self.channels;

                if graph.render(ticks, &mut self.scratch[..len]).is_err() {
                    self.pending = 0..0;
                    output.fill(0.0);
                    return BridgeOutcome::Silenced;
                }
                self.pending = 0..len;
            }

            written += self.copy_pending(&mut output[written..usable]);
        }

        BridgeOutcome::Rendered
    }

    /// Fill `output` from carry-over only, padding with silence
    ///
    /// Used when the graph can't be reached this period.
    pub fn drain_carry(&mut self, output: &mut [f32]) {
        let usable = output.len() - output.len() % self.channels;
        let written = self.copy_pending(&mut output[..usable]);
        output[written..].fill(0.0);
    }

    /// Copy as much pending audio as fits, applying gain; returns samples copied
    fn copy_pending(&mut self, output: &mut [f32]) -> usize {
        let count = self.pending.len().min(output.len());
        let start = self.pending.start;
        for (dst, src) in output[..count]
            .iter_mut()
            .zip(&self.scratch[start..start + count])
        {
            *dst = sanitize_sample(*src * self.gain);
        }
        self.pending.start += count;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        ControlMessage, GraphResult, PatchPath, ReferenceToneGraph, RenderError,
    };

    /// Emits a running sample counter so dropped or duplicated samples show up
    struct RampGraph {
        channels: usize,
        next: f32,
        calls: usize,
        fail: bool,
    }

    impl RampGraph {
        fn new(channels: usize) -> Self {
            Self {
                channels,
                next: 0.0,
                calls: 0,
                fail: false,
            }
        }
    }

    impl SynthesisGraph for RampGraph {
        fn name(&self) -> &'static str {
            "ramp"
        }
        fn channels_out(&self) -> usize {
            self.channels
        }
        fn open_patch(&mut self, _patch: &PatchPath) -> GraphResult<()> {
            Ok(())
        }
        fn close_patch(&mut self) -> GraphResult<()> {
            Ok(())
        }
        fn has_patch(&self) -> bool {
            false
        }
        fn send(&mut self, _message: &ControlMessage) -> GraphResult<()> {
            Ok(())
        }
        fn render(&mut self, ticks: usize, output: &mut [f32]) -> Result<(), RenderError> {
            self.calls += 1;
            if self.fail {
                return Err(RenderError::NotReady);
            }
            assert_eq!(output.len(), ticks * TICK_SIZE * self.channels);
            for sample in output.iter_mut() {
                *sample = self.next;
                self.next += 1.0;
            }
            Ok(())
        }
    }

    #[test]
    fn test_output_length_matches_request_for_any_frame_count() {
        for frames in [1usize, 17, 63, 64, 65, 100, 128, 1000, 4096] {
            let mut graph = ReferenceToneGraph::new(48000, 2);
            let mut bridge = BlockBridge::new(2, 256, 0.8);
            let mut out = vec![f32::NAN; frames * 2];

            assert_eq!(bridge.render(&mut graph, &mut out), BridgeOutcome::Rendered);
            assert_eq!(out.len(), frames * 2);
            assert!(out.iter().all(|s| s.is_finite() && (-1.0..=1.0).contains(s)));
        }
    }

    #[test]
    fn test_small_request_renders_one_tick_and_carries_rest() {
        let mut graph = RampGraph::new(1);
        let mut bridge = BlockBridge::new(1, 64, 1.0 / 1024.0);

        let mut out = vec![0.0f32; 10];
        bridge.render(&mut graph, &mut out);
        assert_eq!(graph.calls, 1);
        assert_eq!(bridge.carried_frames(), 54);

        // Served entirely from carry-over
        let mut out = vec![0.0f32; 54];
        bridge.render(&mut graph, &mut out);
        assert_eq!(graph.calls, 1);
        assert_eq!(out[0], 10.0 / 1024.0);
        assert_eq!(bridge.carried_frames(), 0);
    }

    #[test]
    fn test_carry_over_drops_no_samples() {
        // Keep the ramp inside [-1, 1]
        let scale = 1.0 / 4096.0;
        let mut graph = RampGraph::new(2);
        let mut bridge = BlockBridge::new(2, 128, scale);

        let mut played = Vec::new();
        for frames in [100usize, 28, 100, 1, 63, 200, 37] {
            let mut out = vec![0.0f32; frames * 2];
            assert_eq!(bridge.render(&mut graph, &mut out), BridgeOutcome::Rendered);
            played.extend(out);
        }

        for (i, sample) in played.iter().enumerate() {
            let expected = i as f32 * scale;
            assert!(
                (sample - expected).abs() < 1e-6,
                "sample {} was {}, expected {}",
                i,
                sample,
                expected
            );
        }
        // Rendered exactly what was needed, rounded up to whole ticks
        let total_frames = played.len() / 2;
        assert_eq!(total_frames + bridge.carried_frames(), total_frames.div_ceil(64) * 64);
    }

    #[test]
    fn test_large_request_renders_in_block_sized_passes() {
        let mut graph = RampGraph::new(1);
        let mut bridge = BlockBridge::new(1, 128, 1.0 / 1024.0);

        let mut out = vec![0.0f32; 500];
        bridge.render(&mut graph, &mut out);
        // 500 frames = 8 ticks, at most 2 ticks per call
        assert_eq!(graph.calls, 4);
        assert_eq!(bridge.carried_frames(), 12);
    }

    #[test]
    fn test_graph_failure_silences_whole_callback() {
        let mut graph = RampGraph::new(2);
        let mut bridge = BlockBridge::new(2, 64, 1.0 / 1024.0);

        // Leave some carry-over behind first
        let mut out = vec![0.0f32; 20];
        bridge.render(&mut graph, &mut out);
        assert!(bridge.carried_frames() > 0);

        graph.fail = true;
        let mut out = vec![0.5f32; 200];
        assert_eq!(bridge.render(&mut graph, &mut out), BridgeOutcome::Silenced);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(bridge.carried_frames(), 0);

        graph.fail = false;
        let mut out = vec![0.0f32; 200];
        assert_eq!(bridge.render(&mut graph, &mut out), BridgeOutcome::Rendered);
    }

    #[test]
    fn test_gain_and_clamping() {
        let mut graph = RampGraph::new(1);
        let mut bridge = BlockBridge::new(1, 64, 0.5);
        let mut out = vec![0.0f32; 64];
        bridge.render(&mut graph, &mut out);

        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.5);
        assert_eq!(out[2], 1.0);
        // 3 * 0.5 = 1.5 is clamped
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn test_drain_carry_pads_with_silence() {
        let mut graph = RampGraph::new(1);
        let mut bridge = BlockBridge::new(1, 64, 1.0 / 1024.0);
        let mut out = vec![0.0f32; 60];
        bridge.render(&mut graph, &mut out);
        assert_eq!(bridge.carried_frames(), 4);

        let mut out = vec![9.0f32; 10];
        bridge.drain_carry(&mut out);
        assert!((out[0] - 60.0 / 1024.0).abs() < 1e-6);
        assert!((out[3] - 63.0 / 1024.0).abs() < 1e-6);
        assert!(out[4..].iter().all(|s| *s == 0.0));
        assert_eq!(bridge.carried_frames(), 0);
    }

    #[test]
    fn test_partial_trailing_frame_is_zeroed() {
        let mut graph = ReferenceToneGraph::new(48000, 2);
        let mut bridge = BlockBridge::new(2, 64, 0.8);
        let mut out = vec![f32::NAN; 7];
        bridge.render(&mut graph, &mut out);
        assert_eq!(out[6], 0.0);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
