//! Completed rehearsal records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::TimerMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: String,
    pub name: String,
    /// Completion time, set once when the run is saved.
    pub date: DateTime<Utc>,
    /// Seconds actually rehearsed.
    pub duration: u32,
    /// Mode active when the run was saved.
    #[serde(rename = "type")]
    pub run_type: TimerMode,
}

impl Run {
    pub fn new(name: String, date: DateTime<Utc>, duration: u32, run_type: TimerMode) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            date,
            duration,
            run_type,
        }
    }
}

/// Label for the next run of a project that already has `existing_runs`.
pub fn run_label(existing_runs: usize) -> String {
    format!("Run #{}", existing_runs + 1)
}
