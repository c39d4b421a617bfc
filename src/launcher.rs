//! Turns a chosen project or quick-start duration into a ready timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::LaunchError;
use crate::models::{normalize_duration, run_label, Project};
use crate::settings::AppSettings;
use crate::timer::{Scheduler, TimerController, TimerEvent, TimerMode, TokioScheduler};

const QUICK_START_NAME: &str = "Quick Start";
/// Every tick is one second on the clock.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParams {
    pub target_secs: u32,
    pub mode: TimerMode,
    /// `None` for quick-start sessions, which are never saved.
    pub project_id: Option<String>,
    pub name: String,
}

impl LaunchParams {
    pub fn for_project(project: &Project, mode: TimerMode) -> Self {
        Self {
            target_secs: project.target_secs,
            mode,
            project_id: Some(project.id.clone()),
            name: run_label(project.runs.len()),
        }
    }

    pub fn quick_start(target_secs: u32, mode: TimerMode) -> Self {
        Self {
            target_secs,
            mode,
            project_id: None,
            name: QUICK_START_NAME.to_string(),
        }
    }

    /// Quick start from a custom minutes/seconds entry.
    pub fn custom_quick_start(minutes: u32, seconds: u32, mode: TimerMode) -> Self {
        let (minutes, seconds) = normalize_duration(minutes, seconds);
        Self::quick_start(minutes.saturating_mul(60).saturating_add(seconds), mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickStartPreset {
    pub label: String,
    pub target_secs: u32,
}

impl QuickStartPreset {
    pub fn from_secs(target_secs: u32) -> Self {
        let label = if target_secs % 60 == 0 {
            format!("{} min", target_secs / 60)
        } else {
            format!("{}:{:02}", target_secs / 60, target_secs % 60)
        };
        Self { label, target_secs }
    }
}

pub struct RunLauncher {
    scheduler: Arc<dyn Scheduler>,
    presets: Vec<QuickStartPreset>,
}

impl RunLauncher {
    pub fn new(scheduler: Arc<dyn Scheduler>, settings: &AppSettings) -> Self {
        Self {
            scheduler,
            presets: settings
                .quick_start_presets
                .iter()
                .copied()
                .filter(|secs| *secs > 0)
                .map(QuickStartPreset::from_secs)
                .collect(),
        }
    }

    /// Launcher driven by the tokio timer.
    pub fn with_tokio(settings: &AppSettings) -> Self {
        Self::new(Arc::new(TokioScheduler), settings)
    }

    pub fn presets(&self) -> &[QuickStartPreset] {
        &self.presets
    }

    /// Looks a preset up by label (`"5 min"`, spacing and case ignored) or by
    /// its 1-based position in [`presets`](Self::presets).
    pub fn preset(&self, key: &str) -> Option<&QuickStartPreset> {
        let key = key.trim();
        if let Ok(position) = key.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|index| self.presets.get(index));
        }

        let wanted = compact(key);
        self.presets
            .iter()
            .find(|preset| compact(&preset.label) == wanted)
    }

    /// Validates `params` and builds an idle session for them.
    pub fn launch(
        &self,
        params: LaunchParams,
    ) -> Result<(TimerController, mpsc::UnboundedReceiver<TimerEvent>), LaunchError> {
        if params.target_secs == 0 {
            return Err(LaunchError::ZeroDuration);
        }
        if params.name.trim().is_empty() {
            return Err(LaunchError::EmptyName);
        }

        log::info!(
            "Launching {} ({}s, {})",
            params.name,
            params.target_secs,
            params.mode
        );
        Ok(TimerController::new(
            params,
            Arc::clone(&self.scheduler),
            TICK_INTERVAL,
        ))
    }
}

fn compact(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
