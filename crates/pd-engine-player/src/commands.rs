//! Stdin command parsing and dispatch
//!
//! One command per line. Message commands are turned into atoms word by word
//! and handed to the engine's dynamic surface, so `float freq high` or
//! `bang 12` are rejected by the same checks as any other dynamic caller.

use anyhow::{bail, Result};

use pd_engine_core::engine::EngineController;
use pd_engine_core::graph::{Atom, MessageKind};

use crate::cli::STDIN_COMMANDS;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Open(String),
    Close,
    Send(MessageKind, Vec<Atom>),
    Stats,
    Help,
    Quit,
}

/// Whether the command loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parse one input line; blank lines and `#` comments yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let atoms = || rest.split_whitespace().map(Atom::parse).collect::<Vec<_>>();

    let command = match word {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "open" => {
            if rest.is_empty() {
                bail!("usage: open <file>");
            }
            Command::Open(rest.to_string())
        }
        "close" => Command::Close,
        "bang" => Command::Send(MessageKind::Bang, atoms()),
        "float" => Command::Send(MessageKind::Float, atoms()),
        "symbol" => Command::Send(MessageKind::Symbol, atoms()),
        "stats" => Command::Stats,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{}' (try 'help')", other),
    };
    Ok(Some(command))
}

/// Run a command against the engine
pub fn execute(engine: &mut EngineController, command: Command) -> Result<Flow> {
    match command {
        Command::Start => {
            engine.start()?;
            println!("engine {}", engine.state());
        }
        Command::Stop => {
            engine.stop();
            println!("engine {}", engine.state());
        }
        Command::Open(path) => {
            engine.open_patch(&path)?;
            println!("patch {}", path);
        }
        Command::Close => engine.close_patch(),
        Command::Send(kind, atoms) => engine.send_atoms(kind, &atoms)?,
        Command::Stats => {
            let patch = engine
                .patch()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".to_string());
            println!(
                "{} | block {} | patch {} | {}",
                engine.state(),
                engine.effective_block_size(),
                patch,
                engine.stats()
            );
        }
        Command::Help => println!("{}", STDIN_COMMANDS),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}
