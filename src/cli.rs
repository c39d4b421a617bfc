/// CLI argument parsing and command handling.
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::console;
use crate::db::Database;
use crate::launcher::{LaunchParams, QuickStartPreset, RunLauncher};
use crate::models::{NewProject, Project};
use crate::settings::{AppSettings, SettingsStore};
use crate::store::{KeyValueStore, ProjectStore};
use crate::timer::{format_clock, format_run_duration, TimerMode};

#[derive(Parser)]
#[command(name = "orate", version, about = "Orate - rehearse talks against the clock")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List saved projects.
    Projects,
    /// Create a project.
    New {
        /// Defaults to the next free "Untitled" name.
        #[arg(short = 'n', long = "name")]
        name: Option<String>,
        #[arg(short = 'm', long = "minutes", default_value_t = 0)]
        minutes: u32,
        #[arg(short = 's', long = "seconds", default_value_t = 0)]
        seconds: u32,
        #[arg(short = 'w', long = "words", default_value_t = 0)]
        words: u32,
        #[arg(long = "script")]
        script: Option<String>,
    },
    /// Show a project's run history.
    Show { id: String },
    /// Rehearse a project; the run is saved with `w`.
    Run {
        id: String,
        #[arg(long = "mode")]
        mode: Option<TimerMode>,
    },
    /// Time a one-off rehearsal that is never saved. Lists the presets when
    /// neither seconds nor a preset is given.
    Quick {
        /// Custom length in seconds.
        seconds: Option<u32>,
        /// Preset label ("5 min") or its position in the list.
        #[arg(short = 'p', long = "preset", conflicts_with = "seconds")]
        preset: Option<String>,
        #[arg(long = "mode")]
        mode: Option<TimerMode>,
    },
    /// Show or change settings.
    Settings {
        /// Mode sessions open in when `--mode` is not given.
        #[arg(long = "mode")]
        mode: Option<TimerMode>,
        /// Quick-start presets in seconds, comma separated.
        #[arg(long = "presets", value_delimiter = ',')]
        presets: Option<Vec<u32>>,
    },
}

/// Execute a CLI command against `store`.
pub async fn run<K: KeyValueStore>(
    command: Command,
    store: &ProjectStore<K>,
    settings_store: &SettingsStore,
) -> Result<()> {
    let settings = settings_store.settings();
    match command {
        Command::Projects => handle_projects(store).await?,
        Command::New {
            name,
            minutes,
            seconds,
            words,
            script,
        } => handle_new(name, minutes, seconds, words, script, store).await?,
        Command::Show { id } => handle_show(&id, store).await?,
        Command::Run { id, mode } => handle_run(&id, mode, store, &settings).await?,
        Command::Quick {
            seconds,
            preset,
            mode,
        } => handle_quick(seconds, preset, mode, store, &settings).await?,
        Command::Settings { mode, presets } => handle_settings(mode, presets, settings_store)?,
    }
    Ok(())
}

async fn handle_projects<K: KeyValueStore>(store: &ProjectStore<K>) -> Result<()> {
    let projects = store.load_or_empty().await;
    if projects.is_empty() {
        println!("No projects yet. Create one with `orate new`.");
        return Ok(());
    }
    for project in &projects {
        println!("{}", project_line(project));
    }
    Ok(())
}

async fn handle_new<K: KeyValueStore>(
    name: Option<String>,
    minutes: u32,
    seconds: u32,
    words: u32,
    script: Option<String>,
    store: &ProjectStore<K>,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => store.suggest_name().await,
    };
    let project = NewProject {
        name,
        minutes,
        seconds,
        word_count: words,
        script_name: script,
    }
    .into_project()?;

    store.create(project.clone()).await?;
    println!("Created {}", project_line(&project));
    Ok(())
}

async fn handle_show<K: KeyValueStore>(id: &str, store: &ProjectStore<K>) -> Result<()> {
    let project = store.find_by_id(id).await?;
    println!("{}", project_line(&project));
    if let Some(script) = &project.script_name {
        println!("Script: {script}");
    }
    if project.runs.is_empty() {
        println!("No runs yet.");
    }
    for run in &project.runs {
        println!(
            "  {:<10} {:>6}  {:<9}  {}",
            run.name,
            format_run_duration(run.duration),
            run.run_type,
            run.date.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn handle_run<K: KeyValueStore>(
    id: &str,
    mode: Option<TimerMode>,
    store: &ProjectStore<K>,
    settings: &AppSettings,
) -> Result<()> {
    let project = store
        .find_by_id(id)
        .await
        .with_context(|| format!("Cannot rehearse project {id}"))?;
    let launcher = RunLauncher::with_tokio(settings);
    let params = LaunchParams::for_project(&project, mode.unwrap_or(settings.default_mode));
    rehearse(&launcher, params, store).await
}

async fn handle_quick<K: KeyValueStore>(
    seconds: Option<u32>,
    preset: Option<String>,
    mode: Option<TimerMode>,
    store: &ProjectStore<K>,
    settings: &AppSettings,
) -> Result<()> {
    let launcher = RunLauncher::with_tokio(settings);
    let mode = mode.unwrap_or(settings.default_mode);
    match quick_params(&launcher, seconds, preset.as_deref(), mode)? {
        Some(params) => rehearse(&launcher, params, store).await,
        None => {
            print_presets(launcher.presets());
            Ok(())
        }
    }
}

/// Params for a quick start, or `None` when nothing was chosen.
fn quick_params(
    launcher: &RunLauncher,
    seconds: Option<u32>,
    preset: Option<&str>,
    mode: TimerMode,
) -> Result<Option<LaunchParams>> {
    if let Some(key) = preset {
        let preset = launcher
            .preset(key)
            .with_context(|| format!("Unknown preset '{key}'; run `orate quick` to list them"))?;
        return Ok(Some(LaunchParams::quick_start(preset.target_secs, mode)));
    }
    Ok(seconds.map(|seconds| LaunchParams::custom_quick_start(0, seconds, mode)))
}

fn handle_settings(
    mode: Option<TimerMode>,
    presets: Option<Vec<u32>>,
    settings_store: &SettingsStore,
) -> Result<()> {
    let mut settings = settings_store.settings();
    if mode.is_none() && presets.is_none() {
        print_settings(&settings);
        return Ok(());
    }

    if let Some(mode) = mode {
        settings.default_mode = mode;
    }
    if let Some(presets) = presets {
        if presets.is_empty() || presets.contains(&0) {
            bail!("Presets must be one or more durations above zero seconds");
        }
        settings.quick_start_presets = presets;
    }

    settings_store.update(settings.clone())?;
    print_settings(&settings);
    Ok(())
}

async fn rehearse<K: KeyValueStore>(
    launcher: &RunLauncher,
    params: LaunchParams,
    store: &ProjectStore<K>,
) -> Result<()> {
    let (controller, events) = launcher.launch(params)?;
    console::run_session(controller, events, store).await
}

fn print_presets(presets: &[QuickStartPreset]) {
    println!("Quick-start presets (use `orate quick --preset <label|number>`):");
    for (position, preset) in presets.iter().enumerate() {
        println!("  {}. {}", position + 1, preset.label);
    }
}

fn print_settings(settings: &AppSettings) {
    let presets: Vec<_> = settings
        .quick_start_presets
        .iter()
        .map(|secs| QuickStartPreset::from_secs(*secs).label)
        .collect();
    println!("Default mode: {}", settings.default_mode);
    println!("Quick-start presets: {}", presets.join(", "));
}

fn project_line(project: &Project) -> String {
    format!(
        "{}  {}  {} ({} words, {} runs)",
        project.id,
        project.name,
        format_clock(project.target_secs),
        project.word_count,
        project.runs.len()
    )
}

/// Default database file inside `data_dir`.
pub fn open_database(data_dir: &std::path::Path) -> Result<Database> {
    Database::new(data_dir.join("orate.sqlite3"))
}
