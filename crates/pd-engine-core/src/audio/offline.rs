//! Offline backend - runs the render callback on the caller's thread
//!
//! No hardware is involved: whoever holds an [`OfflineBackend`] handle pulls
//! buffers through the installed callback. Used for headless rendering and
//! for exercising the engine lifecycle in tests. It can also be told to
//! refuse the next `open`, standing in for a device that fails to start.

use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{AudioBackend, AudioCallback, OutputStream};
use super::config::StreamSpec;
use super::error::{AudioError, AudioResult};

#[derive(Default)]
struct OfflineState {
    callback: Option<Box<dyn AudioCallback>>,
    spec: Option<StreamSpec>,
    fail_next_open: Option<String>,
    opened: usize,
}

/// Backend whose "device" is driven manually
///
/// Cloning yields another handle to the same device, so a test can keep one
/// handle while the engine owns the other.
#[derive(Clone, Default)]
pub struct OfflineBackend {
    state: Arc<Mutex<OfflineState>>,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, OfflineState> {
        // A panicking callback must not wedge every later pull
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `open` fail with a stream build error
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        self.lock().fail_next_open = Some(reason.into());
    }

    /// Whether a stream is currently open
    pub fn is_open(&self) -> bool {
        self.lock().callback.is_some()
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        self.lock().opened
    }

    /// Spec of the open stream, if any
    pub fn spec(&self) -> Option<StreamSpec> {
        self.lock().spec.clone()
    }

    /// Run one callback into `output`
    ///
    /// Returns false (leaving `output` untouched) if no stream is open.
    pub fn pull_into(&self, output: &mut [f32]) -> bool {
        let mut state = self.lock();
        match state.callback.as_mut() {
            Some(callback) => {
                callback.process(output);
                true
            }
            None => false,
        }
    }

    /// Run one callback of `frames` frames and return the interleaved samples
    pub fn pull(&self, frames: usize) -> Option<Vec<f32>> {
        let channels = self.lock().spec.as_ref()?.channels as usize;
        let mut output = vec![0.0f32; frames * channels];
        self.pull_into(&mut output).then_some(output)
    }
}

impl AudioBackend for OfflineBackend {
    fn open(
        &self,
        spec: &StreamSpec,
        callback: Box<dyn AudioCallback>,
    ) -> AudioResult<Box<dyn OutputStream>> {
        let mut state = self.lock();
        if let Some(reason) = state.fail_next_open.take() {
            return Err(AudioError::StreamBuildError(reason));
        }
        if state.callback.is_some() {
            return Err(AudioError::StreamBuildError(
                "offline device already has an open stream".to_string(),
            ));
        }

        state.callback = Some(callback);
        state.spec = Some(spec.clone());
        state.opened += 1;
        log::debug!(
            "Offline stream opened: {} channels @ {}Hz, {} frame period",
            spec.channels,
            spec.sample_rate,
            spec.buffer_frames
        );

        Ok(Box::new(OfflineStream {
            state: Arc::clone(&self.state),
            sample_rate: spec.sample_rate,
            buffer_frames: spec.buffer_frames,
        }))
    }
}

struct OfflineStream {
    state: Arc<Mutex<OfflineState>>,
    sample_rate: u32,
    buffer_frames: u32,
}

impl OfflineStream {
    fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Dropped while holding the lock, so no pull can be mid-callback
        state.callback = None;
        state.spec = None;
    }
}

impl OutputStream for OfflineStream {
    fn stop(self: Box<Self>) {
        self.release();
        log::debug!("Offline stream stopped");
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn buffer_frames(&self) -> u32 {
        self.buffer_frames
    }

    fn device_name(&self) -> &str {
        "offline"
    }
}

impl Drop for OfflineStream {
    fn drop(&mut self) {
        self.release();
    }
}
