//! Engine configuration
//!
//! Everything the controller needs to bring up a session. The config is
//! fixed while the engine is Running; change it with
//! [`EngineController::set_config`](crate::engine::EngineController::set_config)
//! while Stopped.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::audio::DeviceId;
use crate::engine::{EngineError, EngineResult};
use crate::graph::GraphKind;
use crate::{
    round_block_size, DEFAULT_BLOCK_SIZE, DEFAULT_CHANNELS_IN, DEFAULT_CHANNELS_OUT,
    DEFAULT_OUTPUT_GAIN, DEFAULT_SAMPLE_RATE, MAX_BLOCK_SIZE,
};

/// Default capacity of the control message queue
pub const DEFAULT_MESSAGE_QUEUE_CAPACITY: usize = 256;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate shared by the device and the graph
    /// Default: 48000
    pub sample_rate: u32,

    /// Requested block size in frames
    /// Rounded up to a whole number of 64-frame ticks at start.
    /// Range: 1 to 8192. Default: 64
    pub block_size: u32,

    /// Interleaved output channels
    /// Default: 2
    pub channels_out: u16,

    /// Input channels handed to the graph (always fed silence)
    /// Default: 0
    pub channels_in: u16,

    /// Synthesis backend
    pub graph: GraphKind,

    /// Uniform gain applied before output, in (0.0, 1.0]
    /// Default: 0.8
    pub output_gain: f32,

    /// Output device (None = system default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceId>,

    /// Extra directories searched for abstractions and externals
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,

    /// Control messages that can wait for the audio thread
    /// Default: 256
    pub message_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            channels_out: DEFAULT_CHANNELS_OUT,
            channels_in: DEFAULT_CHANNELS_IN,
            graph: GraphKind::default(),
            output_gain: DEFAULT_OUTPUT_GAIN,
            device: None,
            search_paths: Vec::new(),
            message_queue_capacity: DEFAULT_MESSAGE_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Config with the given stream parameters and defaults elsewhere
    pub fn new(sample_rate: u32, block_size: u32, channels_out: u16) -> Self {
        Self {
            sample_rate,
            block_size,
            channels_out,
            ..Self::default()
        }
    }

    pub fn with_graph(mut self, graph: GraphKind) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_output_gain(mut self, gain: f32) -> Self {
        self.output_gain = gain;
        self
    }

    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Block size actually used: the request rounded up to whole ticks
    pub fn effective_block_size(&self) -> u32 {
        round_block_size(self.block_size)
    }

    /// Check every field, reporting the first invalid one
    pub fn validate(&self) -> EngineResult<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::Configuration(
                "sample_rate must be greater than 0".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(EngineError::Configuration(
                "block_size must be greater than 0".to_string(),
            ));
        }
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(EngineError::Configuration(format!(
                "block_size must be at most {}, got {}",
                MAX_BLOCK_SIZE, self.block_size
            )));
        }
        if self.channels_out == 0 {
            return Err(EngineError::Configuration(
                "channels_out must be at least 1".to_string(),
            ));
        }
        if !(self.output_gain > 0.0 && self.output_gain <= 1.0) {
            return Err(EngineError::Configuration(format!(
                "output_gain must be in (0.0, 1.0], got {}",
                self.output_gain
            )));
        }
        if self.message_queue_capacity == 0 {
            return Err(EngineError::Configuration(
                "message_queue_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
