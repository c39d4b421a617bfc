//! Line-oriented front end for one running session.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::store::{KeyValueStore, ProjectStore};
use crate::timer::{
    format_run_duration, ColorHint, CommitOutcome, TimerController, TimerEvent, TimerSnapshot,
};

// Set to true to log console commands as they are handled
const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_warn};

pub const HELP: &str = "s start/pause/resume · l lap · r reset · t toggle mode · w save · q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    StartPause,
    Lap,
    Reset,
    ToggleMode,
    Save,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "s" => Some(ConsoleCommand::StartPause),
            "l" => Some(ConsoleCommand::Lap),
            "r" => Some(ConsoleCommand::Reset),
            "t" => Some(ConsoleCommand::ToggleMode),
            "w" => Some(ConsoleCommand::Save),
            "q" => Some(ConsoleCommand::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub fn render(snapshot: &TimerSnapshot) -> String {
    let band = match snapshot.color {
        ColorHint::Neutral => "",
        ColorHint::Safe => " [safe]",
        ColorHint::Warning => " [warning]",
        ColorHint::Critical => " [critical]",
    };
    format!(
        "{} {} ({}, {}){}",
        snapshot.run_name, snapshot.display, snapshot.mode, snapshot.phase, band
    )
}

/// Drives `controller` from stdin until the session is saved or abandoned.
pub async fn run_session<K: KeyValueStore>(
    controller: TimerController,
    mut events: mpsc::UnboundedReceiver<TimerEvent>,
    store: &ProjectStore<K>,
) -> Result<()> {
    let mut out = std::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    writeln!(out, "{}", render(&controller.snapshot()))?;
    writeln!(out, "{HELP}")?;

    loop {
        tokio::select! {
            Some(event) = events.recv() => print_event(&event, &mut out)?,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    controller.abandon();
                    break;
                };
                let Some(command) = ConsoleCommand::parse(&line) else {
                    if !line.trim().is_empty() {
                        writeln!(out, "{HELP}")?;
                    }
                    continue;
                };
                if execute(&controller, command, store, &mut out).await? == Flow::Exit {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn print_event(event: &TimerEvent, out: &mut impl Write) -> Result<()> {
    match event {
        TimerEvent::Tick(snapshot) => writeln!(out, "{}", render(snapshot))?,
        TimerEvent::Expired => writeln!(out, "Time's up!")?,
    }
    Ok(())
}

async fn execute<K: KeyValueStore>(
    controller: &TimerController,
    command: ConsoleCommand,
    store: &ProjectStore<K>,
    out: &mut impl Write,
) -> Result<Flow> {
    log_debug!("console command {command:?}");

    let result = match command {
        ConsoleCommand::StartPause => controller.toggle_pause().map(|s| render(&s)),
        ConsoleCommand::Reset => controller.reset().map(|s| render(&s)),
        ConsoleCommand::ToggleMode => controller.toggle_mode().map(|s| render(&s)),
        ConsoleCommand::Lap => controller
            .lap()
            .map(|lap| format!("Lap {} at {}", lap.sequence_number, lap.time_label)),
        ConsoleCommand::Quit => {
            controller.abandon();
            return Ok(Flow::Exit);
        }
        ConsoleCommand::Save => {
            match controller.save(store).await {
                Ok(CommitOutcome::Skipped) => writeln!(out, "Quick start finished.")?,
                Ok(CommitOutcome::Saved(run)) => writeln!(
                    out,
                    "Saved {} ({})",
                    run.name,
                    format_run_duration(run.duration)
                )?,
                Ok(CommitOutcome::Failed(err)) => {
                    log_warn!("Run was not saved: {err}");
                    writeln!(out, "Could not save run: {err}")?;
                }
                Err(err) => writeln!(out, "{err}")?,
            }
            return Ok(Flow::Exit);
        }
    };

    match result {
        Ok(line) => writeln!(out, "{line}")?,
        Err(err) => writeln!(out, "{err}")?,
    }
    Ok(Flow::Continue)
}
