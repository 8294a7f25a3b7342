//! CPAL audio backend implementation
//!
//! Opens one output stream on the configured (or default) device and runs
//! the engine's render callback on CPAL's audio thread.
//!
//! ```text
//! ┌──────────────────┐   open(spec, callback)   ┌─────────────────────┐
//! │  Control Thread  │─────────────────────────►│    CpalBackend      │
//! │ (EngineController)│◄──── Box<OutputStream> ──│  picks config,      │
//! └──────────────────┘                          │  builds stream      │
//!                                               └──────────┬──────────┘
//!                                                          │ data callback
//!                                                          ▼
//!                                               ┌─────────────────────┐
//!                                               │  CPAL Audio Thread  │
//!                                               │ staging f32 buffer  │
//!                                               │ → AudioCallback     │
//!                                               │ → device format T   │
//!                                               └─────────────────────┘
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig, SupportedBufferSize};

use super::backend::{AudioBackend, AudioCallback, OutputStream};
use super::config::{StreamSpec, MAX_BUFFER_SIZE};
use super::device::{find_device_by_id, get_default_device};
use super::error::{AudioError, AudioResult};

/// Hardware output through CPAL
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for CpalBackend {
    fn open(
        &self,
        spec: &StreamSpec,
        callback: Box<dyn AudioCallback>,
    ) -> AudioResult<Box<dyn OutputStream>> {
        let device = match &spec.device {
            Some(id) => find_device_by_id(id)?,
            None => get_default_device()?,
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let (supported, buffer_size, buffer_frames) = get_output_config(&device, &device_name, spec)?;

        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size,
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_output_stream::<f32>(&device, &stream_config, callback)?,
            SampleFormat::I16 => build_output_stream::<i16>(&device, &stream_config, callback)?,
            SampleFormat::U16 => build_output_stream::<u16>(&device, &stream_config, callback)?,
            format => {
                return Err(AudioError::ConfigError(format!(
                    "Unsupported sample format: {:?}",
                    format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!(
            "Audio stream started: {} channels, {}Hz, {:?} ({} frames, ~{:.1}ms latency)",
            stream_config.channels,
            spec.sample_rate,
            supported.sample_format(),
            buffer_frames,
            (buffer_frames as f32 / spec.sample_rate as f32) * 1000.0
        );

        Ok(Box::new(CpalStream {
            stream,
            sample_rate: spec.sample_rate,
            buffer_frames,
            device_name,
        }))
    }
}

/// A running CPAL output stream
struct CpalStream {
    stream: Stream,
    sample_rate: u32,
    buffer_frames: u32,
    device_name: String,
}

impl OutputStream for CpalStream {
    fn stop(self: Box<Self>) {
        if let Err(e) = self.stream.pause() {
            log::debug!("Pausing stream on '{}' failed: {}", self.device_name, e);
        }
        // Dropping the stream joins CPAL's audio thread
        drop(self.stream);
        log::info!("Audio stream on '{}' stopped", self.device_name);
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn buffer_frames(&self) -> u32 {
        self.buffer_frames
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Preference order for device sample formats
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::F32 => Some(0),
        SampleFormat::I16 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

/// Get the output configuration matching the stream spec
///
/// The channel count and sample rate are fixed by the engine configuration,
/// so only configs that support both exactly are considered. Returns
/// (config, cpal buffer size, period in frames).
fn get_output_config(
    device: &cpal::Device,
    device_name: &str,
    spec: &StreamSpec,
) -> AudioResult<(cpal::SupportedStreamConfig, CpalBufferSize, u32)> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    if supported_configs.is_empty() {
        return Err(AudioError::ConfigError(
            "No supported output configurations".to_string(),
        ));
    }

    let best_config = supported_configs
        .iter()
        .filter(|c| c.channels() == spec.channels)
        .filter(|c| {
            spec.sample_rate >= c.min_sample_rate().0 && spec.sample_rate <= c.max_sample_rate().0
        })
        .filter_map(|c| format_rank(c.sample_format()).map(|rank| (rank, c)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, c)| c)
        .ok_or_else(|| AudioError::UnsupportedConfig {
            device: device_name.to_string(),
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })?;

    let (buffer_size, buffer_frames) = match best_config.buffer_size() {
        SupportedBufferSize::Range { min, max }
            if spec.buffer_frames < *min || spec.buffer_frames > *max =>
        {
            log::warn!(
                "Device '{}' supports periods of {}-{} frames, {} requested; using device default",
                device_name,
                min,
                max,
                spec.buffer_frames
            );
            (CpalBufferSize::Default, spec.buffer_frames)
        }
        _ => (CpalBufferSize::Fixed(spec.buffer_frames), spec.buffer_frames),
    };

    log::debug!(
        "Selected {:?} config with {} frame period",
        best_config.sample_format(),
        buffer_frames
    );

    Ok((
        best_config.clone().with_sample_rate(cpal::SampleRate(spec.sample_rate)),
        buffer_size,
        buffer_frames,
    ))
}

/// Build the output stream for device sample type `T`
///
/// The callback always renders f32 into a staging buffer allocated here, then
/// converts into the device buffer. Callbacks larger than the staging buffer
/// are rendered in several passes. A panic inside the callback silences the
/// stream from then on instead of unwinding into CPAL.
fn build_output_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut callback: Box<dyn AudioCallback>,
) -> AudioResult<Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut staging = vec![0.0f32; MAX_BUFFER_SIZE * channels];
    let mut poisoned = false;

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                for chunk in data.chunks_mut(staging.len()) {
                    let scratch = &mut staging[..chunk.len()];

                    if poisoned {
                        scratch.fill(0.0);
                    } else {
                        let result =
                            catch_unwind(AssertUnwindSafe(|| callback.process(scratch)));
                        if result.is_err() {
                            poisoned = true;
                            scratch.fill(0.0);
                        }
                    }

                    for (dst, src) in chunk.iter_mut().zip(scratch.iter()) {
                        *dst = T::from_sample(*src);
                    }
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    Ok(stream)
}
