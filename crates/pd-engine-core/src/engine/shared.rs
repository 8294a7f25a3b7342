//! State shared between the control thread and the audio callback
//!
//! ```text
//!  Control thread                         Audio thread
//!  ──────────────                         ────────────
//!  MessageSender ──(rtrb)──┐
//!                          ▼
//!  lock() ───────► Mutex<GraphSlot> ◄──── try_lock()   (RenderTarget)
//!  patch open/close   { graph,               drain messages,
//!  teardown             MessageReceiver }    BlockBridge::render
//!
//!  stats() ◄──────── RenderStats (atomics) ◄── counters
//! ```
//!
//! The audio thread never waits on the slot: if the control thread holds it
//! (patch change in progress) the callback plays whatever carry-over is left
//! and pads with silence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use super::bridge::{BlockBridge, BridgeOutcome};
use super::command::MessageReceiver;
use crate::audio::AudioCallback;
use crate::graph::SynthesisGraph;

/// Lock-free render counters for control-thread access
///
/// Written by the audio thread (and by the controller for dropped messages),
/// read from anywhere. All operations use `Ordering::Relaxed`: the counters
/// are only ever displayed.
#[derive(Debug, Default)]
pub struct RenderStats {
    callbacks: AtomicU64,
    frames_rendered: AtomicU64,
    silent_callbacks: AtomicU64,
    contended_callbacks: AtomicU64,
    dropped_messages: AtomicU64,
}

impl RenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn record_callback(&self, frames: usize) {
        self.callbacks.fetch_add(1, Ordering::Relaxed);
        self.frames_rendered
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    #[inline]
    fn record_silent(&self) {
        self.silent_callbacks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_contended(&self) {
        self.contended_callbacks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped_messages(&self, count: usize) {
        if count > 0 {
            self.dropped_messages
                .fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        self.callbacks.store(0, Ordering::Relaxed);
        self.frames_rendered.store(0, Ordering::Relaxed);
        self.silent_callbacks.store(0, Ordering::Relaxed);
        self.contended_callbacks.store(0, Ordering::Relaxed);
        self.dropped_messages.store(0, Ordering::Relaxed);
    }

    /// Read all counters at once
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            callbacks: self.callbacks.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            silent_callbacks: self.silent_callbacks.load(Ordering::Relaxed),
            contended_callbacks: self.contended_callbacks.load(Ordering::Relaxed),
            dropped_messages: self.dropped_messages.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RenderStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Audio callbacks served
    pub callbacks: u64,
    /// Frames delivered to the device (silence included)
    pub frames_rendered: u64,
    /// Callbacks silenced by a graph render failure
    pub silent_callbacks: u64,
    /// Callbacks that found the graph busy
    pub contended_callbacks: u64,
    /// Messages lost to a full queue or rejected by the graph
    pub dropped_messages: u64,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "callbacks={} frames={} silent={} contended={} dropped_messages={}",
            self.callbacks,
            self.frames_rendered,
            self.silent_callbacks,
            self.contended_callbacks,
            self.dropped_messages
        )
    }
}

/// The graph together with the graph-side end of the message queue
pub struct GraphSlot {
    pub graph: Box<dyn SynthesisGraph>,
    pub messages: MessageReceiver,
}

impl GraphSlot {
    /// Deliver queued messages, counting the ones the graph refused
    pub fn deliver_pending(&mut self, stats: &RenderStats) {
        let (_, failed) = self.messages.drain_into(self.graph.as_mut());
        stats.record_dropped_messages(failed);
    }
}

/// One Running session's graph, reachable from both threads
pub struct SharedGraph {
    slot: Mutex<GraphSlot>,
    stats: Arc<RenderStats>,
}

impl SharedGraph {
    pub fn new(
        graph: Box<dyn SynthesisGraph>,
        messages: MessageReceiver,
        stats: Arc<RenderStats>,
    ) -> Self {
        Self {
            slot: Mutex::new(GraphSlot { graph, messages }),
            stats,
        }
    }

    /// Lock the slot from the control thread (blocking)
    ///
    /// A poisoned lock is recovered: the graph itself is still usable.
    pub fn lock(&self) -> MutexGuard<'_, GraphSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock the slot from the audio thread without waiting
    fn try_lock(&self) -> Option<MutexGuard<'_, GraphSlot>> {
        match self.slot.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }
}

/// The audio callback: shared graph plus this session's block bridge
pub struct RenderTarget {
    shared: Arc<SharedGraph>,
    bridge: BlockBridge,
}

impl RenderTarget {
    pub fn new(shared: Arc<SharedGraph>, bridge: BlockBridge) -> Self {
        Self { shared, bridge }
    }
}

impl AudioCallback for RenderTarget {
    fn process(&mut self, output: &mut [f32]) {
        let stats = &self.shared.stats;
        stats.record_callback(output.len() / self.bridge.channels());

        let Some(mut slot) = self.shared.try_lock() else {
            stats.record_contended();
            self.bridge.drain_carry(output);
            return;
        };

        slot.deliver_pending(stats);
        if self.bridge.render(slot.graph.as_mut(), output) == BridgeOutcome::Silenced {
            stats.record_silent();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command::message_channel;
    use crate::graph::{ControlMessage, ReferenceToneGraph};

    fn target(channels: u16) -> (RenderTarget, Arc<SharedGraph>, crate::engine::MessageSender) {
        let (tx, rx) = message_channel(8);
        let shared = Arc::new(SharedGraph::new(
            Box::new(ReferenceToneGraph::new(48000, channels)),
            rx,
            Arc::new(RenderStats::new()),
        ));
        let bridge = BlockBridge::new(channels as usize, 64, 0.8);
        (RenderTarget::new(Arc::clone(&shared), bridge), shared, tx)
    }

    #[test]
    fn test_render_target_counts_callbacks_and_frames() {
        let (mut target, shared, _tx) = target(2);
        let mut out = vec![0.0f32; 200];
        target.process(&mut out);
        target.process(&mut out);

        let stats = shared.stats().snapshot();
        assert_eq!(stats.callbacks, 2);
        assert_eq!(stats.frames_rendered, 200);
        assert_eq!(stats.silent_callbacks, 0);
        assert!(out.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_contended_slot_plays_silence() {
        let (mut target, shared, _tx) = target(1);
        let guard = shared.lock();

        let mut out = vec![0.7f32; 32];
        target.process(&mut out);
        assert!(out.iter().all(|s| *s == 0.0));
        drop(guard);

        let stats = shared.stats().snapshot();
        assert_eq!(stats.contended_callbacks, 1);
        assert_eq!(stats.callbacks, 1);
    }

    #[test]
    fn test_messages_are_drained_before_render() {
        let (mut target, shared, mut tx) = target(2);
        tx.send(ControlMessage::Bang {
            receiver: "play".into(),
        })
        .unwrap();
        assert_eq!(shared.lock().messages.pending(), 1);

        let mut out = vec![0.0f32; 128];
        target.process(&mut out);
        assert_eq!(shared.lock().messages.pending(), 0);
        assert_eq!(shared.stats().snapshot().dropped_messages, 0);
    }

    #[test]
    fn test_stats_reset() {
        let stats = RenderStats::new();
        stats.record_callback(64);
        stats.record_dropped_messages(3);
        assert_eq!(stats.snapshot().dropped_messages, 3);
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
