//! PdGraph - Pure Data synthesis through libpd-rs
//!
//! Wraps one libpd instance configured for the engine's channel layout and
//! sample rate. Messages and patch changes arrive from the control thread
//! while `render` is called from the audio thread; the engine serializes the
//! two through its graph slot, so this type does no locking of its own.
//!
//! `send` runs on the audio thread when messages are drained before a render.
//! libpd-rs copies each receiver name and symbol into a `CString` there, a
//! small allocation per message; the message strings themselves are handed
//! back to the control thread to be freed.

use std::path::Path;
use std::sync::Once;

use libpd_rs::functions::receive::on_print;
use libpd_rs::functions::send::{send_bang_to, send_float_to, send_symbol_to};
use libpd_rs::functions::verbose_print_state;
use libpd_rs::{Pd, PdAudioContext};

use crate::TICK_SIZE;

use super::error::{GraphError, GraphResult, RenderError};
use super::message::{ControlMessage, PatchPath};
use super::{GraphSettings, SynthesisGraph};

/// Global flag to ensure the print hook is only registered once
static PRINT_HOOK_INIT: Once = Once::new();

/// Route Pd console output into the `log` facade (once per process)
fn init_print_hook() {
    PRINT_HOOK_INIT.call_once(|| {
        verbose_print_state(true);

        on_print(|msg: &str| {
            let msg = msg.trim();
            if msg.is_empty() {
                return;
            }

            if msg.contains("error") || msg.contains("can't") || msg.contains("couldn't") {
                log::error!("[PD] {}", msg);
            } else if msg.contains("warning") || msg.contains("deprecated") {
                log::warn!("[PD] {}", msg);
            } else {
                log::info!("[PD] {}", msg);
            }
        });

        log::debug!("PD print hook initialized");
    });
}

/// Pure Data graph backed by a libpd instance
pub struct PdGraph {
    pd: Pd,
    ctx: PdAudioContext,
    channels_out: usize,
    channels_in: usize,
    /// Silent input fed to libpd, sized for one full block
    input: Vec<f32>,
    /// `$0` of the open patch
    dollar_zero: Option<i32>,
    dsp_active: bool,
}

// SAFETY: the libpd instance is only touched through `&mut self`, and the
// engine keeps the graph behind a mutex so control-thread calls and
// audio-thread renders never overlap. libpd holds no thread-local state
// between calls beyond the current-instance pointer, which every entry
// point resets with `set_as_current`.
unsafe impl Send for PdGraph {}

impl PdGraph {
    pub fn new(settings: &GraphSettings) -> GraphResult<Self> {
        init_print_hook();

        let mut pd = Pd::init_and_configure(
            settings.channels_in as i32,
            settings.channels_out as i32,
            settings.sample_rate as i32,
        )
        .map_err(|e| GraphError::AudioConfigFailed {
            channels: settings.channels_out,
            sample_rate: settings.sample_rate,
            reason: e.to_string(),
        })?;

        for path in &settings.search_paths {
            add_search_path(&mut pd, path)?;
        }

        pd.activate_audio(true).map_err(|e| {
            GraphError::InitializationFailed(format!("Failed to activate DSP: {}", e))
        })?;

        let ctx = pd.audio_context();
        let channels_in = settings.channels_in as usize;

        log::info!(
            "PdGraph created: {} in / {} out @ {}Hz, block {}",
            settings.channels_in,
            settings.channels_out,
            settings.sample_rate,
            settings.block_size
        );

        Ok(Self {
            pd,
            ctx,
            channels_out: settings.channels_out as usize,
            channels_in,
            input: vec![0.0; settings.block_size as usize * channels_in],
            dollar_zero: None,
            dsp_active: true,
        })
    }

    /// `$0` of the open patch, for instance-scoped receivers
    pub fn dollar_zero(&self) -> Option<i32> {
        self.dollar_zero
    }
}

fn add_search_path(pd: &mut Pd, path: &Path) -> GraphResult<()> {
    pd.add_path_to_search_paths(path).map_err(|e| {
        GraphError::InitializationFailed(format!(
            "Failed to add search path {}: {}",
            path.display(),
            e
        ))
    })?;
    log::debug!("Added PD search path: {}", path.display());
    Ok(())
}

impl SynthesisGraph for PdGraph {
    fn name(&self) -> &'static str {
        "pd"
    }

    fn channels_out(&self) -> usize {
        self.channels_out
    }

    fn open_patch(&mut self, patch: &PatchPath) -> GraphResult<()> {
        let path = patch.full_path();
        if !path.is_file() {
            return Err(GraphError::PatchNotFound(path));
        }

        self.pd.set_as_current();
        self.pd.open_patch(&path).map_err(|e| GraphError::PatchOpenFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let dollar_zero = match self.pd.dollar_zero() {
            Ok(value) => value,
            Err(e) => {
                let _ = self.pd.close_patch();
                return Err(GraphError::PatchOpenFailed {
                    path,
                    reason: format!("Failed to get $0: {}", e),
                });
            }
        };
        self.dollar_zero = Some(dollar_zero);

        log::info!(
            "Opened PD patch {} from '{}' ($0={})",
            patch.file_name,
            patch.directory,
            dollar_zero
        );
        Ok(())
    }

    fn close_patch(&mut self) -> GraphResult<()> {
        if self.dollar_zero.take().is_none() {
            return Ok(());
        }
        self.pd.set_as_current();
        self.pd
            .close_patch()
            .map_err(|e| GraphError::PatchCloseFailed(e.to_string()))?;
        log::debug!("Closed PD patch");
        Ok(())
    }

    fn has_patch(&self) -> bool {
        self.dollar_zero.is_some()
    }

    fn send(&mut self, message: &ControlMessage) -> GraphResult<()> {
        self.pd.set_as_current();

        let result = match message {
            ControlMessage::Bang { receiver } => send_bang_to(receiver),
            ControlMessage::Float { receiver, value } => send_float_to(receiver, *value),
            ControlMessage::Symbol { receiver, text } => send_symbol_to(receiver, text),
        };

        result.map_err(|e| GraphError::SendFailed {
            msg_type: match message {
                ControlMessage::Bang { .. } => "bang",
                ControlMessage::Float { .. } => "float",
                ControlMessage::Symbol { .. } => "symbol",
            },
            receiver: message.receiver().to_string(),
            reason: e.to_string(),
        })
    }

    fn render(&mut self, ticks: usize, output: &mut [f32]) -> Result<(), RenderError> {
        if !self.dsp_active {
            return Err(RenderError::NotReady);
        }

        let expected = ticks * TICK_SIZE * self.channels_out;
        let input_len = ticks * TICK_SIZE * self.channels_in;
        if output.len() != expected {
            return Err(RenderError::BufferMismatch {
                expected,
                actual: output.len(),
            });
        }
        if input_len > self.input.len() {
            return Err(RenderError::BufferMismatch {
                expected: input_len,
                actual: self.input.len(),
            });
        }

        self.pd.set_as_current();
        self.ctx
            .process_float(ticks as i32, &self.input[..input_len], output);
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.close_patch() {
            log::warn!("Error closing PD patch during shutdown: {}", e);
        }
        if self.dsp_active {
            if let Err(e) = self.pd.activate_audio(false) {
                log::warn!("Failed to deactivate PD DSP: {}", e);
            }
            self.dsp_active = false;
        }
        log::debug!("PdGraph shut down");
    }
}

impl Drop for PdGraph {
    fn drop(&mut self) {
        if self.dsp_active || self.dollar_zero.is_some() {
            self.shutdown();
        }
    }
}
