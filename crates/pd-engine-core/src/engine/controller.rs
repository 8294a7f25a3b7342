//! EngineController - lifecycle state machine for one audio engine
//!
//! ```text
//!            start() ──────────────────────────┐
//!   ┌─────────┐  validate, create graph,   ┌───▼─────┐
//!   │ Stopped │  reopen patch, open device │ Running │
//!   └────▲────┘                            └───┬─────┘
//!        └──────── stop() / Drop ──────────────┘
//!                 device first, then graph
//! ```
//!
//! The state is not stored separately: the engine is Running exactly when a
//! [`Session`] (device stream + graph + message producer) exists, so device
//! resources can't outlive the Running state or exist without it.
//!
//! The controller is not `Send`: some audio hosts require their stream handle
//! to stay on the thread that created it. Drive it from one control thread.

use std::sync::Arc;

use super::bridge::BlockBridge;
use super::command::{message_channel, MessageSender};
use super::error::{EngineError, EngineResult};
use super::shared::{RenderStats, RenderTarget, SharedGraph, StatsSnapshot};
use crate::audio::{AudioBackend, CpalBackend, OutputStream, StreamSpec};
use crate::config::EngineConfig;
use crate::graph::{
    Atom, ControlMessage, DefaultGraphFactory, GraphError, GraphFactory, GraphSettings,
    MessageKind, PatchPath,
};

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Running => write!(f, "running"),
        }
    }
}

/// Resources that exist only while Running
struct Session {
    stream: Box<dyn OutputStream>,
    shared: Arc<SharedGraph>,
    sender: MessageSender,
}

pub struct EngineController {
    config: EngineConfig,
    backend: Box<dyn AudioBackend>,
    graph_factory: Box<dyn GraphFactory>,
    session: Option<Session>,
    /// Open while Running, or remembered for the next start while Stopped
    patch: Option<PatchPath>,
    stats: Arc<RenderStats>,
}

impl EngineController {
    /// Create a stopped engine that plays through CPAL
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, CpalBackend::new())
    }

    /// Create a stopped engine on a specific audio backend
    pub fn with_backend(config: EngineConfig, backend: impl AudioBackend + 'static) -> Self {
        Self {
            config,
            backend: Box::new(backend),
            graph_factory: Box::new(DefaultGraphFactory),
            session: None,
            patch: None,
            stats: Arc::new(RenderStats::new()),
        }
    }

    /// Replace the factory used to create the graph at each start
    pub fn with_graph_factory(mut self, factory: impl GraphFactory + 'static) -> Self {
        self.graph_factory = Box::new(factory);
        self
    }

    pub fn state(&self) -> EngineState {
        if self.session.is_some() {
            EngineState::Running
        } else {
            EngineState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration (Stopped only)
    pub fn set_config(&mut self, config: EngineConfig) -> EngineResult<()> {
        if self.is_running() {
            return Err(EngineError::Configuration(
                "configuration can't change while the engine is running".to_string(),
            ));
        }
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Block size used by the graph and requested from the device
    pub fn effective_block_size(&self) -> u32 {
        self.config.effective_block_size()
    }

    /// The open (or remembered) patch
    pub fn patch(&self) -> Option<&PatchPath> {
        self.patch.as_ref()
    }

    /// Name of the device the stream plays on, while Running
    pub fn device_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.stream.device_name())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Start the engine
    ///
    /// No-op if already Running. On failure the engine stays Stopped with
    /// nothing allocated.
    pub fn start(&mut self) -> EngineResult<()> {
        if self.is_running() {
            log::debug!("start: engine already running");
            return Ok(());
        }

        self.config.validate()?;
        let config = &self.config;
        let block_size = config.effective_block_size();
        if block_size != config.block_size {
            log::info!(
                "Block size {} rounded up to {} (whole 64-frame ticks)",
                config.block_size,
                block_size
            );
        }

        let settings = GraphSettings {
            kind: config.graph,
            sample_rate: config.sample_rate,
            block_size,
            channels_out: config.channels_out,
            channels_in: config.channels_in,
            search_paths: config.search_paths.clone(),
        };
        let mut graph = self
            .graph_factory
            .create(&settings)
            .map_err(EngineError::GraphInit)?;

        if let Some(patch) = self.patch.take() {
            match graph.open_patch(&patch) {
                Ok(()) => {
                    log::info!("Reopened patch {}", patch);
                    self.patch = Some(patch);
                }
                Err(e) => {
                    log::warn!("Could not reopen patch {}: {}; continuing without it", patch, e)
                }
            }
        }

        let graph_name = graph.name();
        let (sender, receiver) = message_channel(self.config.message_queue_capacity);
        let shared = Arc::new(SharedGraph::new(graph, receiver, Arc::clone(&self.stats)));
        let bridge = BlockBridge::new(
            self.config.channels_out as usize,
            block_size as usize,
            self.config.output_gain,
        );
        let target = RenderTarget::new(Arc::clone(&shared), bridge);

        let spec = StreamSpec {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels_out,
            buffer_frames: block_size,
            device: self.config.device.clone(),
        };

        self.stats.reset();
        let stream = match self.backend.open(&spec, Box::new(target)) {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("Failed to open audio device: {}", e);
                // The backend dropped the render target, so this is the last handle
                release_graph(&shared);
                return Err(EngineError::DeviceInit(e));
            }
        };

        log::info!(
            "Engine started: {} graph, {}Hz, {} channels, block {} (~{:.1}ms), device period {} on '{}'",
            graph_name,
            stream.sample_rate(),
            spec.channels,
            block_size,
            spec.latency_ms(),
            stream.buffer_frames(),
            stream.device_name()
        );

        self.session = Some(Session {
            stream,
            shared,
            sender,
        });
        Ok(())
    }

    /// Stop the engine
    ///
    /// Stops the device first (no callback runs after this returns), then
    /// releases the graph. No-op if already Stopped.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.stream.stop();
        drop(session.sender);
        release_graph(&session.shared);

        let stats = self.stats.snapshot();
        log::info!("Engine stopped ({})", stats);
    }

    /// Open a patch, replacing the current one
    ///
    /// While Stopped the patch is only checked for existence and remembered;
    /// it is opened by the next `start()`.
    pub fn open_patch(&mut self, path: &str) -> EngineResult<()> {
        if path.is_empty() {
            return Err(EngineError::InvalidArgument("patch path is empty".to_string()));
        }
        let patch = PatchPath::split(path);
        let load_error = |source: GraphError| EngineError::PatchLoad {
            path: path.to_string(),
            source,
        };

        let Some(session) = &self.session else {
            let full_path = patch.full_path();
            if !full_path.is_file() {
                return Err(load_error(GraphError::PatchNotFound(full_path)));
            }
            log::info!("Engine stopped; patch {} will open on start", patch);
            self.patch = Some(patch);
            return Ok(());
        };

        let mut slot = session.shared.lock();
        // Messages sent before this call belong to the outgoing patch
        slot.deliver_pending(session.shared.stats());

        if slot.graph.has_patch() {
            if let Some(previous) = &self.patch {
                log::info!("Closing patch {}", previous);
            }
            if let Err(e) = slot.graph.close_patch() {
                log::warn!("Closing previous patch failed: {}", e);
            }
        }
        self.patch = None;

        slot.graph.open_patch(&patch).map_err(load_error)?;
        drop(slot);

        log::info!("Opened patch {}", patch);
        self.patch = Some(patch);
        Ok(())
    }

    /// Close the open patch and forget it; no-op if there is none
    pub fn close_patch(&mut self) {
        let Some(patch) = self.patch.take() else {
            return;
        };

        if let Some(session) = &self.session {
            let mut slot = session.shared.lock();
            slot.deliver_pending(session.shared.stats());
            if let Err(e) = slot.graph.close_patch() {
                log::warn!("Closing patch {} failed: {}", patch, e);
                return;
            }
        }
        log::info!("Closed patch {}", patch);
    }

    pub fn send_bang(&mut self, receiver: &str) -> EngineResult<()> {
        self.enqueue(ControlMessage::Bang {
            receiver: receiver.to_string(),
        })
    }

    pub fn send_float(&mut self, receiver: &str, value: f32) -> EngineResult<()> {
        self.enqueue(ControlMessage::Float {
            receiver: receiver.to_string(),
            value,
        })
    }

    pub fn send_symbol(&mut self, receiver: &str, text: &str) -> EngineResult<()> {
        self.enqueue(ControlMessage::Symbol {
            receiver: receiver.to_string(),
            text: text.to_string(),
        })
    }

    /// Send a message built from dynamic atoms (`atoms[0]` is the receiver)
    pub fn send_atoms(&mut self, kind: MessageKind, atoms: &[Atom]) -> EngineResult<()> {
        let message = ControlMessage::from_atoms(kind, atoms)?;
        self.enqueue(message)
    }

    /// Queue a message for the graph (best effort)
    fn enqueue(&mut self, message: ControlMessage) -> EngineResult<()> {
        if message.receiver().is_empty() {
            return Err(EngineError::InvalidArgument(
                "receiver name is empty".to_string(),
            ));
        }

        let Some(session) = self.session.as_mut() else {
            log::debug!(
                "Engine stopped, ignoring {} to '{}'",
                message.kind(),
                message.receiver()
            );
            return Ok(());
        };

        if let Err(message) = session.sender.send(message) {
            self.stats.record_dropped_messages(1);
            log::warn!(
                "Message queue full, dropping {} to '{}'",
                message.kind(),
                message.receiver()
            );
        }
        Ok(())
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Close the patch and shut the graph down
fn release_graph(shared: &SharedGraph) {
    let mut slot = shared.lock();
    if slot.graph.has_patch() {
        if let Err(e) = slot.graph.close_patch() {
            log::warn!("Closing patch during shutdown failed: {}", e);
        }
    }
    slot.graph.shutdown();
    log::debug!("{} graph released", slot.graph.name());
}
