//! Command line flags

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

pub const STDIN_COMMANDS: &str = "\
Commands (stdin, one per line):
  start | stop | open <file> | close | bang <recv> | float <recv> <value>
  symbol <recv> <text> | stats | help | quit";

#[derive(Debug, Parser, Clone)]
#[command(name = "pd-engine", version)]
#[command(about = "Real-time Pure Data host")]
#[command(after_help = STDIN_COMMANDS)]
pub struct Cli {
    /// Config file (default: <config dir>/pd-engine/config.yaml)
    #[arg(long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Patch to open at startup
    #[arg(long, value_name = "FILE")]
    pub patch: Option<String>,

    /// Send a bang every MS milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub bang_every: Option<u64>,

    /// Receiver for the periodic bang (default: play)
    #[arg(long, value_name = "NAME")]
    pub bang_receiver: Option<String>,

    /// Output device name, as shown by --list-devices
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Extra directory searched for abstractions (repeatable)
    #[arg(long = "search-path", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,

    /// Quit after SECS seconds
    #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
    pub duration: Option<Duration>,

    /// Render without an audio device and log output peaks
    #[arg(long)]
    pub offline: bool,

    /// List audio output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Write the effective config back to the config file
    #[arg(long)]
    pub save_config: bool,
}

impl Cli {
    pub fn bang_interval(&self) -> Option<Duration> {
        self.bang_every.map(Duration::from_millis)
    }
}

/// Positive, finite number of seconds
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err("must be a positive number of seconds".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}
