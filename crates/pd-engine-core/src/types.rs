//! Shared types and constants for the engine

/// Frames per synthesis tick (Pure Data's fixed DSP block)
pub const TICK_SIZE: usize = 64;

/// Default hardware/graph sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default requested block size in frames
pub const DEFAULT_BLOCK_SIZE: u32 = 64;

/// Largest accepted block size in frames (a whole number of ticks)
///
/// Matches the largest buffer the audio backends stage per pass.
pub const MAX_BLOCK_SIZE: u32 = crate::audio::MAX_BUFFER_SIZE as u32;

/// Default number of interleaved output channels
pub const DEFAULT_CHANNELS_OUT: u16 = 2;

/// Default number of input channels (unused by the render path)
pub const DEFAULT_CHANNELS_IN: u16 = 0;

/// Gain applied to every rendered sample before it reaches the device
pub const DEFAULT_OUTPUT_GAIN: f32 = 0.8;

/// Round a requested block size up to the nearest whole number of ticks
///
/// Never returns less than one tick, and always a multiple of it:
/// - 0 or 50 -> 64
/// - 100 -> 128
/// - 130 -> 192
///
/// Requests too large to round up within `u32` get the largest tick multiple
/// that fits; [`EngineConfig::validate`](crate::config::EngineConfig::validate)
/// rejects anything above [`MAX_BLOCK_SIZE`] before it is used.
pub fn round_block_size(requested: u32) -> u32 {
    let tick = TICK_SIZE as u32;
    let ticks = requested.div_ceil(tick).clamp(1, u32::MAX / tick);
    ticks * tick
}

/// Make a rendered sample safe for the device: finite and within [-1, 1]
#[inline]
pub fn sanitize_sample(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_block_size() {
        assert_eq!(round_block_size(0), 64);
        assert_eq!(round_block_size(1), 64);
        assert_eq!(round_block_size(50), 64);
        assert_eq!(round_block_size(64), 64);
        assert_eq!(round_block_size(65), 128);
        assert_eq!(round_block_size(100), 128);
        assert_eq!(round_block_size(130), 192);
        assert_eq!(round_block_size(1024), 1024);
    }

    #[test]
    fn test_round_block_size_is_smallest_multiple() {
        for requested in 1..2000u32 {
            let rounded = round_block_size(requested);
            assert_eq!(rounded % 64, 0);
            assert!(rounded >= requested);
            assert!(rounded - requested < 64);
        }
    }

    #[test]
    fn test_round_block_size_never_leaves_tick_grid() {
        for requested in [u32::MAX - 63, u32::MAX - 10, u32::MAX, MAX_BLOCK_SIZE + 1] {
            assert_eq!(round_block_size(requested) % 64, 0, "{}", requested);
        }
        assert_eq!(round_block_size(u32::MAX), u32::MAX / 64 * 64);
        assert_eq!(MAX_BLOCK_SIZE % 64, 0);
        assert_eq!(round_block_size(MAX_BLOCK_SIZE), MAX_BLOCK_SIZE);
    }

    #[test]
    fn test_sanitize_sample() {
        assert_eq!(sanitize_sample(0.5), 0.5);
        assert_eq!(sanitize_sample(1.5), 1.0);
        assert_eq!(sanitize_sample(-3.0), -1.0);
        assert_eq!(sanitize_sample(f32::NAN), 0.0);
        assert_eq!(sanitize_sample(f32::INFINITY), 0.0);
    }
}
