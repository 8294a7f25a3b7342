//! Audio output for the engine
//!
//! The engine hands a [`AudioCallback`] to an [`AudioBackend`] at `start()`
//! and gets back an [`OutputStream`] it owns until `stop()`:
//!
//! - [`CpalBackend`]: hardware output through CPAL (ALSA/PipeWire, WASAPI,
//!   CoreAudio)
//! - [`OfflineBackend`]: no hardware; the caller pulls buffers through the
//!   callback on its own thread (tests, headless rendering)
//!
//! # Real-Time Contract
//!
//! The callback runs on the device's real-time thread. It must not block on
//! locks held by other threads, must not allocate, and must finish well
//! within `frames / sample_rate`. Stream configuration is fixed when the
//! stream is opened.

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;
mod offline;

pub use backend::{AudioBackend, AudioCallback, OutputStream};
pub use config::{DeviceId, StreamSpec, MAX_BUFFER_SIZE};
pub use cpal_backend::CpalBackend;
pub use device::{find_device_by_id, get_default_device, get_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use offline::OfflineBackend;
