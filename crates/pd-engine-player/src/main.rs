//! pd-engine - command-line host for the real-time Pure Data engine
//!
//! This is the main entry point. It:
//! 1. Loads the YAML config and applies command line overrides
//! 2. Starts the engine on the configured audio device (or offline)
//! 3. Opens the startup patch and sends the optional periodic bang
//! 4. Reads control commands from stdin until `quit`, EOF or `--duration`
//!
//! Set RUST_LOG=debug for verbose output.

mod cli;
mod commands;
mod config;
mod offline;

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use pd_engine_core::audio::{get_output_devices, DeviceId, OfflineBackend};
use pd_engine_core::engine::EngineController;

use cli::Cli;
use commands::Flow;
use config::{default_config_path, load_config, save_config, PlayerConfig};

/// Seconds rendered by `--offline` when no `--duration` is given
const DEFAULT_OFFLINE_SECONDS: u64 = 5;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Cli::parse();

    if args.list_devices {
        list_devices();
        return Ok(());
    }

    let config_path = args.config_path.clone().unwrap_or_else(default_config_path);
    let mut config: PlayerConfig = load_config(&config_path);
    apply_overrides(&mut config, &args);

    if args.save_config {
        save_config(&config, &config_path)?;
        println!("Config saved to {}", config_path.display());
    }

    log::info!("pd-engine starting up ({:?} graph)", config.engine.graph);

    if args.offline {
        run_offline(config, &args)
    } else {
        run_live(config, &args)
    }
}

/// Command line flags win over the config file
fn apply_overrides(config: &mut PlayerConfig, args: &Cli) {
    if let Some(patch) = &args.patch {
        config.startup.patch = Some(patch.clone());
    }
    if let Some(receiver) = &args.bang_receiver {
        config.startup.bang_receiver = receiver.clone();
    }
    if let Some(every) = args.bang_interval() {
        config.startup.bang_interval_ms = Some(every.as_millis() as u64);
    }

    let mut engine = std::mem::take(&mut config.engine);
    if let Some(device) = &args.device {
        engine = engine.with_device(DeviceId::new(device.as_str()));
    }
    for path in &args.search_paths {
        engine = engine.with_search_path(path.clone());
    }
    config.engine = engine;
}

fn list_devices() {
    match get_output_devices() {
        Ok(devices) => {
            println!("Audio output devices (* = host default):");
            for device in devices {
                println!("  {}", device);
            }
        }
        Err(e) => eprintln!("Could not list audio devices: {}", e),
    }
}

fn run_offline(config: PlayerConfig, args: &Cli) -> Result<()> {
    let backend = OfflineBackend::new();
    let mut engine = EngineController::with_backend(config.engine, backend.clone());
    let timing = offline::OfflineRun {
        duration: args
            .duration
            .unwrap_or(Duration::from_secs(DEFAULT_OFFLINE_SECONDS)),
        bang_every: config.startup.bang_interval_ms.map(Duration::from_millis),
        bang_receiver: config.startup.bang_receiver,
    };

    let peaks = offline::run(
        &mut engine,
        &backend,
        config.startup.patch.as_deref(),
        &timing,
    )?;
    let overall = peaks.iter().map(|p| p.peak).fold(0.0f32, f32::max);
    println!("Rendered {} second(s), overall peak {:.3}", peaks.len(), overall);
    Ok(())
}

fn run_live(config: PlayerConfig, args: &Cli) -> Result<()> {
    let startup = config.startup;
    let mut engine = EngineController::new(config.engine);
    engine.start().context("Failed to start audio engine")?;

    if let Some(patch) = &startup.patch {
        if let Err(e) = engine.open_patch(patch) {
            log::error!("{}", e);
        }
    }

    println!("pd-engine running. Type 'help' for commands.");

    let lines = spawn_stdin_reader();
    let bang_every = startup.bang_interval_ms.map(Duration::from_millis);
    let deadline = args.duration.map(|d| Instant::now() + d);
    let mut next_bang = bang_every.map(|_| Instant::now());
    let mut stdin_open = true;

    loop {
        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            log::info!("Duration elapsed");
            break;
        }

        if let (Some(every), Some(due)) = (bang_every, next_bang) {
            if now >= due {
                if let Err(e) = engine.send_bang(&startup.bang_receiver) {
                    log::warn!("Periodic bang failed: {}", e);
                }
                next_bang = Some(due + every);
            }
        }

        let wake = [deadline, next_bang].into_iter().flatten().min();
        let timeout = wake
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_millis(250));

        if !stdin_open {
            std::thread::sleep(timeout);
            continue;
        }

        match lines.recv_timeout(timeout) {
            Ok(line) => {
                if handle_line(&mut engine, &line) == Flow::Quit {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if deadline.is_none() {
                    log::info!("stdin closed");
                    break;
                }
                stdin_open = false;
            }
        }
    }

    engine.stop();
    println!("pd-engine stopped ({})", engine.stats());
    Ok(())
}

/// Parse and run one stdin line, reporting errors without leaving the loop
fn handle_line(engine: &mut EngineController, line: &str) -> Flow {
    let result = commands::parse_command(line).and_then(|command| match command {
        Some(command) => commands::execute(engine, command),
        None => Ok(Flow::Continue),
    });
    result.unwrap_or_else(|e| {
        eprintln!("error: {:#}", e);
        Flow::Continue
    })
}

/// Read stdin lines on a background thread
///
/// The engine stays on the main thread; the channel disconnects at EOF.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        log::warn!("Could not start stdin reader, commands disabled: {}", e);
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = PlayerConfig::default();
        config.startup.patch = Some("from-config.pd".to_string());

        config.engine.sample_rate = 44100;
        config.engine.search_paths = vec!["from-config".into()];

        let args = Cli::try_parse_from([
            "pd-engine",
            "--patch",
            "from-flag.pd",
            "--bang-every",
            "250",
            "--bang-receiver",
            "tick",
            "--device",
            "hw:1",
            "--search-path",
            "abs",
        ])
        .unwrap();
        apply_overrides(&mut config, &args);

        assert_eq!(config.startup.patch.as_deref(), Some("from-flag.pd"));
        assert_eq!(config.startup.bang_interval_ms, Some(250));
        assert_eq!(config.startup.bang_receiver, "tick");
        assert_eq!(config.engine.device, Some(DeviceId::new("hw:1")));
        assert_eq!(
            config.engine.search_paths,
            vec![std::path::PathBuf::from("from-config"), "abs".into()]
        );
        // Untouched engine settings survive
        assert_eq!(config.engine.sample_rate, 44100);
    }

    #[test]
    fn test_handle_line_keeps_going_on_errors() {
        let mut engine = EngineController::with_backend(
            pd_engine_core::config::EngineConfig::default()
                .with_graph(pd_engine_core::graph::GraphKind::ReferenceTone),
            OfflineBackend::new(),
        );
        assert_eq!(handle_line(&mut engine, "nonsense"), Flow::Continue);
        assert_eq!(handle_line(&mut engine, "float"), Flow::Continue);
        assert_eq!(handle_line(&mut engine, ""), Flow::Continue);
        assert_eq!(handle_line(&mut engine, "quit"), Flow::Quit);
    }
}
