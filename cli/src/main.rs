//! Gala CLI - operator console for a prize-draw ceremony.
//!
//! # Event Loop
//!
//! A single task owns the [`DrawEngine`] and multiplexes three sources:
//!
//! 1. Operator input, one command per line on stdin
//! 2. A fixed 50ms tick that advances the engine (`engine.tick()`), prints
//!    reveals and refreshes the rolling display
//! 3. Ctrl-C, which aborts any pending draw before exit
//!
//! Logs go to a file so they never interleave with the console.

mod commands;
mod console;

use std::{
    fs::{self, OpenOptions},
    io::{Write, stdout},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use gala_engine::{DataDirSource, DrawEngine, DrawSettings, GalaConfig, resolve_data_dir};

use commands::Command;
use console::Console;

const TICK: Duration = Duration::from_millis(50);

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_gala_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than write over the console.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_gala_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in gala_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn gala_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.gala/logs/gala.log
    if let Some(config_path) = GalaConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("gala.log"));
    }

    // Fallback: ./.gala/logs/gala.log
    candidates.push(PathBuf::from(".gala").join("logs").join("gala.log"));

    candidates
}

/// Console output that can overwrite the rolling line in place.
#[derive(Default)]
struct Screen {
    rolling: Option<String>,
}

impl Screen {
    fn print(&mut self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        let mut out = stdout().lock();
        if self.rolling.take().is_some() {
            let _ = writeln!(out);
        }
        for line in lines {
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
    }

    fn roll(&mut self, frame: Option<String>) {
        if frame == self.rolling {
            return;
        }
        let mut out = stdout().lock();
        match &frame {
            Some(line) => {
                // Pad to wipe a longer previous frame.
                let width = self.rolling.as_ref().map_or(0, String::len);
                let _ = write!(out, "\r{line:<width$}");
            }
            None => {
                let _ = writeln!(out);
            }
        }
        let _ = out.flush();
        self.rolling = frame;
    }
}

async fn run(console: &mut Console) -> Result<()> {
    let mut screen = Screen::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(TICK);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    screen.print(&["Gala ready. Type `help` for commands.".to_string()]);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    // EOF
                    let _ = console.engine_mut().abort();
                    return Ok(());
                };
                match Command::parse(&line) {
                    Ok(Some(command)) => {
                        let reply = console.execute(command);
                        screen.print(&reply.lines);
                        if reply.quit {
                            return Ok(());
                        }
                    }
                    Ok(None) => {}
                    Err(err) => screen.print(&[err.to_string()]),
                }
            }
            _ = tick.tick() => {
                while let Some(event) = console.engine_mut().tick() {
                    let lines = console.describe_event(&event);
                    screen.print(&lines);
                }
                screen.roll(console.rolling_line());
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!("Failed to listen for Ctrl-C: {e}");
                }
                if console.engine_mut().abort().is_applied() {
                    tracing::info!("Pending draw aborted on interrupt");
                    screen.print(&["Draw aborted; nothing was recorded.".to_string()]);
                }
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = match GalaConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {e}; using defaults");
            tracing::warn!("Failed to load config: {e}");
            None
        }
    };

    let settings = DrawSettings::from_config(config.as_ref());
    let data_dir = resolve_data_dir(config.as_ref());
    match data_dir.source {
        DataDirSource::Fallback => tracing::warn!(
            path = %data_dir.path.display(),
            "Using fallback data directory"
        ),
        source => tracing::info!(
            path = %data_dir.path.display(),
            ?source,
            "Using data directory"
        ),
    }

    let engine = DrawEngine::open(settings, &data_dir.path)
        .with_context(|| format!("Failed to open data in {}", data_dir.path.display()))?;
    let mut console = Console::new(engine);

    let result = run(&mut console).await;
    if let Err(err) = &result {
        eprintln!("Error: {err:?}");
    }
    result
}
