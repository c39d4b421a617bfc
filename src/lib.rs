mod cli;
mod console;
pub mod db;
pub mod error;
pub mod launcher;
pub mod models;
pub mod settings;
pub mod store;
pub mod timer;
mod utils;

use anyhow::Context;
use clap::Parser;

pub use db::Database;
pub use error::{LaunchError, ProjectError, StoreError, TransitionError};
pub use launcher::{LaunchParams, QuickStartPreset, RunLauncher};
pub use models::{NewProject, Project, Run};
pub use settings::{AppSettings, SettingsStore};
pub use store::{KeyValueStore, MemoryStore, ProjectStore};
pub use timer::{
    CommitOutcome, Scheduler, TimerController, TimerEvent, TimerMode, TimerPhase, TimerSnapshot,
    TokioScheduler,
};

const DEBUG_ENV: &str = "ORATE_DEBUG";

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    let level = match std::env::var(DEBUG_ENV).as_deref() {
        Ok("1") | Ok("true") => log::LevelFilter::Debug,
        _ => log::LevelFilter::Info,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let cli_opts = cli::Cli::parse();
    log::info!("Orate starting up...");

    let data_dir = settings::data_dir()?;
    let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let database = cli::open_database(&data_dir)?;
        let store = ProjectStore::new(database);
        cli::run(cli_opts.command, &store, &settings_store).await
    })
}
