//! Headless rendering
//!
//! Drives the engine from an [`OfflineBackend`] as fast as the graph
//! renders, one effective block per pull. Time is counted in frames, so the
//! periodic bang and the duration follow the sample clock, not the wall
//! clock.

use std::time::Duration;

use anyhow::{Context, Result};

use pd_engine_core::audio::OfflineBackend;
use pd_engine_core::engine::EngineController;

/// Timing of an offline run
#[derive(Debug, Clone)]
pub struct OfflineRun {
    pub duration: Duration,
    pub bang_every: Option<Duration>,
    pub bang_receiver: String,
}

/// Peak level of one second of output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondPeak {
    pub second: u64,
    pub peak: f32,
}

/// Render `timing.duration` of audio through a started engine
///
/// Returns the absolute peak of each second rendered (the last one may be
/// partial).
pub fn render(
    engine: &mut EngineController,
    backend: &OfflineBackend,
    timing: &OfflineRun,
) -> Result<Vec<SecondPeak>> {
    let sample_rate = u64::from(engine.config().sample_rate);
    let block = engine.effective_block_size() as usize;
    let channels = engine.config().channels_out as usize;
    let total_frames = (timing.duration.as_secs_f64() * sample_rate as f64).round() as u64;
    let bang_frames = timing
        .bang_every
        .map(|every| ((every.as_secs_f64() * sample_rate as f64).round() as u64).max(1));

    let mut output = vec![0.0f32; block * channels];
    let mut peaks = Vec::new();
    let mut current = SecondPeak { second: 0, peak: 0.0 };
    let mut rendered = 0u64;
    let mut next_bang = 0u64;

    while rendered < total_frames {
        if let Some(interval) = bang_frames {
            if rendered >= next_bang {
                engine.send_bang(&timing.bang_receiver)?;
                next_bang += interval;
            }
        }

        let frames = (total_frames - rendered).min(block as u64) as usize;
        let buffer = &mut output[..frames * channels];
        if !backend.pull_into(buffer) {
            anyhow::bail!("offline device is not open");
        }

        for frame in buffer.chunks(channels) {
            let second = rendered / sample_rate;
            if second != current.second {
                log::info!("{:>4}s peak {:.3}", current.second, current.peak);
                peaks.push(current);
                current = SecondPeak { second, peak: 0.0 };
            }
            for sample in frame {
                current.peak = current.peak.max(sample.abs());
            }
            rendered += 1;
        }
    }

    if rendered > 0 {
        log::info!("{:>4}s peak {:.3}", current.second, current.peak);
        peaks.push(current);
    }
    Ok(peaks)
}

/// Start `engine` on `backend`, optionally open a patch, and render
pub fn run(
    engine: &mut EngineController,
    backend: &OfflineBackend,
    patch: Option<&str>,
    timing: &OfflineRun,
) -> Result<Vec<SecondPeak>> {
    engine.start().context("Failed to start offline engine")?;
    if let Some(patch) = patch {
        engine.open_patch(patch)?;
    }

    let peaks = render(engine, backend, timing)?;
    log::info!(
        "Rendered {:.1}s offline ({})",
        timing.duration.as_secs_f64(),
        engine.stats()
    );
    engine.stop();
    Ok(peaks)
}
