//! Output stream configuration
//!
//! Device identity and the fixed stream parameters negotiated at `start()`.

use serde::{Deserialize, Serialize};

/// Largest hardware buffer the backends stage in one pass (frames)
///
/// Bigger callbacks are processed in chunks of this size, so nothing is
/// allocated on the audio thread.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Audio device identifier
///
/// Includes both the device name and the host backend (ALSA, JACK, ...).
/// This allows selecting devices from different hosts on systems with
/// multiple audio backends available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier (e.g., "ALSA", "JACK", "CoreAudio")
    /// If None, every available host is searched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Get a display label that includes the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Parameters of one output stream, immutable until the stream is stopped
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    /// Interleaved output channels
    pub channels: u16,
    /// Requested hardware period in frames (the effective block size)
    pub buffer_frames: u32,
    /// Output device (None = system default)
    pub device: Option<DeviceId>,
}

impl StreamSpec {
    /// Nominal output latency of one period in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_frames as f32 / self.sample_rate as f32) * 1000.0
    }
}
