//! Player configuration
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/pd-engine/config.yaml

use serde::{Deserialize, Serialize};

use pd_engine_core::config::EngineConfig;

pub use pd_engine_core::config::{default_config_path, load_config, save_config};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Engine parameters (stream format, graph backend, device)
    pub engine: EngineConfig,
    /// What to do once the engine is up
    pub startup: StartupConfig,
}

/// Startup section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Patch opened right after start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    /// Receiver for the periodic bang
    /// Default: "play"
    pub bang_receiver: String,
    /// Periodic bang interval in milliseconds (None = no periodic bang)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bang_interval_ms: Option<u64>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            patch: None,
            bang_receiver: "play".to_string(),
            bang_interval_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pd_engine_core::graph::GraphKind;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = PlayerConfig {
            engine: EngineConfig::new(44100, 100, 2).with_graph(GraphKind::ReferenceTone),
            startup: StartupConfig {
                patch: Some("/patches/synth.pd".to_string()),
                bang_receiver: "tick".to_string(),
                bang_interval_ms: Some(1000),
            },
        };

        save_config(&config, &path).unwrap();
        let loaded: PlayerConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml() {
        let config: PlayerConfig =
            serde_yaml::from_str("engine:\n  sample_rate: 44100\nstartup:\n  bang_interval_ms: 500\n")
                .unwrap();
        assert_eq!(config.engine.sample_rate, 44100);
        assert_eq!(config.engine.block_size, 64);
        assert_eq!(config.startup.bang_receiver, "play");
        assert_eq!(config.startup.bang_interval_ms, Some(500));
    }
}
