//! Engine configuration
//!
//! - [`EngineConfig`]: the parameters fixed for one Running session
//! - Generic YAML config loading/saving
//! - Default config location
//!
//! # Usage
//!
//! ```ignore
//! use pd_engine_core::config::{default_config_path, load_config, save_config, EngineConfig};
//!
//! let path = default_config_path();
//! let config: EngineConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod engine;
mod io;
mod paths;

pub use engine::{EngineConfig, DEFAULT_MESSAGE_QUEUE_CAPACITY};
pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path, CONFIG_FILE_NAME};
