//! Real-time engine
//!
//! - [`EngineController`]: start/stop lifecycle, patch management, message
//!   routing (control thread)
//! - [`BlockBridge`]: 64-frame ticks to arbitrary device periods, with
//!   carry-over (audio thread)
//! - [`RenderTarget`] / [`SharedGraph`]: what the audio callback owns and what
//!   it shares with the controller
//! - message queue: lock-free control messages from the control thread to
//!   the graph

mod bridge;
mod command;
mod controller;
mod error;
mod shared;

pub use bridge::{BlockBridge, BridgeOutcome};
pub use command::{message_channel, MessageReceiver, MessageSender};
pub use controller::{EngineController, EngineState};
pub use error::{EngineError, EngineResult};
pub use shared::{GraphSlot, RenderStats, RenderTarget, SharedGraph, StatsSnapshot};
