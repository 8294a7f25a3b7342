//! Backend traits connecting the engine to an output device
//!
//! The engine passes its render state to the backend explicitly as an
//! [`AudioCallback`] instead of capturing it in an ad-hoc closure; the
//! backend decides which thread runs it.

use super::config::StreamSpec;
use super::error::AudioResult;

/// Render target invoked once per hardware period
///
/// Called on the real-time thread with an interleaved buffer of
/// `frames * channels` samples. Implementations must fill every sample and
/// must never block.
pub trait AudioCallback: Send + 'static {
    fn process(&mut self, output: &mut [f32]);
}

/// A running output stream
///
/// Dropping the stream stops it as well; `stop` exists to make the teardown
/// point explicit.
pub trait OutputStream {
    /// Stop the stream and release the device
    ///
    /// On return the callback is no longer running and will not be invoked
    /// again.
    fn stop(self: Box<Self>);

    /// Sample rate the device actually runs at
    fn sample_rate(&self) -> u32;

    /// Hardware period in frames as negotiated with the device
    fn buffer_frames(&self) -> u32;

    /// Human-readable device name for logs
    fn device_name(&self) -> &str;
}

/// Opens output streams for the engine
pub trait AudioBackend {
    /// Open and start a stream that calls `callback` on the audio thread
    fn open(
        &self,
        spec: &StreamSpec,
        callback: Box<dyn AudioCallback>,
    ) -> AudioResult<Box<dyn OutputStream>>;
}
